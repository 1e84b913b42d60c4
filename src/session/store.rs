//! The session store
//!
//! Holds the message sequence, the developer-mode flag and the document
//! status behind one lock. Every mutation re-serialises the affected entry
//! while the lock is held, so writes reach storage in mutation order.

use super::message::{Message, MessageId, NewMessage};
use super::persist::KeyValueStore;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub const MESSAGES_KEY: &str = "chatMessages";
pub const DEVELOPER_MODE_KEY: &str = "developerMode";
pub const DOCUMENT_STATUS_KEY: &str = "documentStatus";

/// Largest id accepted from storage. Anything above is treated as corrupt,
/// which leaves the counter far from `u64::MAX`.
const MAX_MESSAGE_ID: u64 = (1 << 53) - 1;

/// Whether a processed document is available to chat about
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    AwaitingDocument,
    Ready {
        name: String,
    },
}

/// Which interface the front end shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Upload,
    Chat,
}

/// Snapshot of the persisted session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub messages: Vec<Message>,
    pub developer_mode: bool,
    pub document: DocumentStatus,
}

impl Session {
    pub fn view(&self) -> View {
        match self.document {
            DocumentStatus::AwaitingDocument => View::Upload,
            DocumentStatus::Ready { .. } => View::Chat,
        }
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }
}

#[derive(Debug, Clone, Copy)]
enum Entry {
    Messages,
    DeveloperMode,
    DocumentStatus,
}

impl Entry {
    fn key(self) -> &'static str {
        match self {
            Entry::Messages => MESSAGES_KEY,
            Entry::DeveloperMode => DEVELOPER_MODE_KEY,
            Entry::DocumentStatus => DOCUMENT_STATUS_KEY,
        }
    }
}

struct Inner {
    session: Session,
    next_id: u64,
    retrying: HashSet<MessageId>,
}

/// Process-wide session state, shared by handle
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
    inner: Mutex<Inner>,
}

impl SessionStore {
    /// Rehydrate from storage. Missing or malformed entries fall back to
    /// their defaults independently; this never fails.
    pub fn load(kv: Arc<dyn KeyValueStore>) -> Self {
        let mut messages: Vec<Message> = read_entry(kv.as_ref(), Entry::Messages);
        let developer_mode: bool = read_entry(kv.as_ref(), Entry::DeveloperMode);
        let document: DocumentStatus = read_entry(kv.as_ref(), Entry::DocumentStatus);

        let highest = messages.iter().map(|m| m.id.get()).max().unwrap_or(0);
        let next_id = if highest > MAX_MESSAGE_ID {
            tracing::warn!(
                key = MESSAGES_KEY,
                highest,
                "Discarding session entry with out-of-range message ids"
            );
            messages.clear();
            1
        } else {
            highest + 1
        };

        tracing::debug!(
            messages = messages.len(),
            developer_mode,
            next_id,
            "Session loaded"
        );

        Self {
            kv,
            inner: Mutex::new(Inner {
                session: Session {
                    messages,
                    developer_mode,
                    document,
                },
                next_id,
                retrying: HashSet::new(),
            }),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.inner.lock().unwrap().session.clone()
    }

    #[cfg(test)]
    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock().unwrap().session.messages.clone()
    }

    pub fn message(&self, id: MessageId) -> Option<Message> {
        self.inner.lock().unwrap().session.message(id).cloned()
    }

    pub fn developer_mode(&self) -> bool {
        self.inner.lock().unwrap().session.developer_mode
    }

    #[cfg(test)]
    pub fn document_status(&self) -> DocumentStatus {
        self.inner.lock().unwrap().session.document.clone()
    }

    pub fn view(&self) -> View {
        self.inner.lock().unwrap().session.view()
    }

    /// Append a message, assigning the next id and the current time
    pub fn append(&self, draft: NewMessage) -> Message {
        let mut inner = self.inner.lock().unwrap();
        let id = MessageId(inner.next_id);
        // Starts at most MAX_MESSAGE_ID + 1, so this cannot wrap
        inner.next_id += 1;

        let message = draft.into_message(id, Utc::now());
        inner.session.messages.push(message.clone());
        self.persist(&inner, Entry::Messages);
        message
    }

    /// Mutate one message in place. Returns the updated message, or `None`
    /// (and writes nothing) if the id is unknown.
    pub fn update<F>(&self, id: MessageId, f: F) -> Option<Message>
    where
        F: FnOnce(&mut Message),
    {
        let mut inner = self.inner.lock().unwrap();
        let message = inner.session.messages.iter_mut().find(|m| m.id == id)?;
        f(message);
        let updated = message.clone();
        self.persist(&inner, Entry::Messages);
        Some(updated)
    }

    /// Flip developer mode, returning the new value
    pub fn toggle_developer_mode(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.session.developer_mode = !inner.session.developer_mode;
        self.persist(&inner, Entry::DeveloperMode);
        inner.session.developer_mode
    }

    pub fn mark_document_ready(&self, name: impl Into<String>) {
        let mut inner = self.inner.lock().unwrap();
        inner.session.document = DocumentStatus::Ready { name: name.into() };
        self.persist(&inner, Entry::DocumentStatus);
    }

    /// Drop the conversation and go back to awaiting a document.
    /// Developer mode is a preference and survives.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.session.messages.clear();
        inner.session.document = DocumentStatus::AwaitingDocument;
        inner.retrying.clear();
        self.persist(&inner, Entry::Messages);
        self.persist(&inner, Entry::DocumentStatus);
    }

    /// Mark `id` as having a retry in flight. Returns `false` if one already is.
    pub fn begin_retry(&self, id: MessageId) -> bool {
        self.inner.lock().unwrap().retrying.insert(id)
    }

    pub fn end_retry(&self, id: MessageId) {
        self.inner.lock().unwrap().retrying.remove(&id);
    }

    pub fn is_retrying(&self, id: MessageId) -> bool {
        self.inner.lock().unwrap().retrying.contains(&id)
    }

    /// Like [`begin_retry`](Self::begin_retry), but the marker is cleared
    /// when the returned guard drops.
    pub fn try_mark_retrying(&self, id: MessageId) -> Option<RetryMarker<'_>> {
        self.begin_retry(id).then_some(RetryMarker { store: self, id })
    }

    fn persist(&self, inner: &Inner, entry: Entry) {
        let serialized = match entry {
            Entry::Messages => serde_json::to_string(&inner.session.messages),
            Entry::DeveloperMode => serde_json::to_string(&inner.session.developer_mode),
            Entry::DocumentStatus => serde_json::to_string(&inner.session.document),
        };

        let result = serialized
            .map_err(|e| e.to_string())
            .and_then(|raw| self.kv.write(entry.key(), &raw));

        if let Err(e) = result {
            tracing::warn!(key = entry.key(), error = %e, "Failed to persist session entry");
        }
    }
}

/// Clears a message's retry marker on drop
pub struct RetryMarker<'a> {
    store: &'a SessionStore,
    id: MessageId,
}

impl Drop for RetryMarker<'_> {
    fn drop(&mut self) {
        self.store.end_retry(self.id);
    }
}

fn read_entry<T: DeserializeOwned + Default>(kv: &dyn KeyValueStore, entry: Entry) -> T {
    match kv.read(entry.key()) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(key = entry.key(), error = %e, "Discarding malformed session entry");
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            tracing::warn!(key = entry.key(), error = %e, "Failed to read session entry");
            T::default()
        }
    }
}
