//! Runtime for the chat client flows
//!
//! Owns the shared session store and the backend, runs the upload,
//! conversation and feedback flows, and broadcasts what changed so any
//! front end can re-render.

mod conversation;
mod feedback;
mod upload;

#[cfg(test)]
pub mod testing;

pub use conversation::RetryOutcome;
pub use feedback::{FeedbackDraft, FeedbackTag};

use crate::backend::Backend;
use crate::notification::Notification;
use crate::session::{Message, MessageId, SessionStore};
use crate::state_machine::{TransitionError, UploadState};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Events sent to front ends
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Notify(Notification),
    MessageAppended(Message),
    MessageUpdated(Message),
    RetryStarted(MessageId),
    RetryFinished(MessageId),
    UploadStateChanged(UploadState),
    DocumentReady { name: String },
    DeveloperModeChanged(bool),
    SessionReset,
}

/// Why a user request was refused. A notification has already been
/// broadcast for each of these.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("Question is empty")]
    EmptyQuestion,
    #[error("Message {0} not found")]
    UnknownMessage(MessageId),
    #[error("Message {0} does not take feedback right now")]
    FeedbackUnavailable(MessageId),
    #[error("Retry is only offered after negative feedback")]
    RetryNotOffered,
    #[error("Cannot reset while an upload is in progress")]
    ResetWhileUploading,
    #[error(transparent)]
    Upload(#[from] TransitionError),
}

#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Delay between `/upload-status` polls
    pub poll_interval: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Shared handle for running flows. Flows take `&self` and may run
/// concurrently; the store serialises their mutations.
pub struct ChatRuntime<B: Backend> {
    store: Arc<SessionStore>,
    backend: Arc<B>,
    events: broadcast::Sender<UiEvent>,
    upload_state: Mutex<UploadState>,
    options: RuntimeOptions,
}

impl<B: Backend> ChatRuntime<B> {
    pub fn new(store: Arc<SessionStore>, backend: Arc<B>, options: RuntimeOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            backend,
            events,
            upload_state: Mutex::new(UploadState::Idle),
            options,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn upload_state(&self) -> UploadState {
        self.upload_state.lock().unwrap().clone()
    }

    pub fn toggle_developer_mode(&self) -> bool {
        let enabled = self.store.toggle_developer_mode();
        tracing::info!(enabled, "Developer mode toggled");
        self.publish(UiEvent::DeveloperModeChanged(enabled));
        enabled
    }

    /// Clear the conversation and return to the upload view
    pub fn reset_session(&self) -> Result<(), FlowError> {
        if self.upload_state.lock().unwrap().is_busy() {
            self.notify(Notification::destructive(
                "Upload In Progress",
                "Wait for the current upload to finish first.",
            ));
            return Err(FlowError::ResetWhileUploading);
        }
        self.store.reset();
        tracing::info!("Session reset");
        self.publish(UiEvent::SessionReset);
        Ok(())
    }

    fn publish(&self, event: UiEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn notify(&self, notification: Notification) {
        self.publish(UiEvent::Notify(notification));
    }

    fn unknown_message(&self, id: MessageId) -> FlowError {
        tracing::warn!(message_id = %id, "Request for unknown message");
        self.notify(Notification::destructive(
            "Unknown Message",
            format!("There is no message with id {id}."),
        ));
        FlowError::UnknownMessage(id)
    }
}
