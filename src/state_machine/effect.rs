//! Effects produced by upload state transitions

use crate::backend::PdfUpload;
use crate::notification::Notification;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Show a transient notification
    Notify(Notification),

    /// Stream the file to the backend
    TransmitFile { upload: PdfUpload },

    /// Wait for the backend to finish indexing
    AwaitProcessing { job_id: Option<String> },

    /// Append an AI message to the conversation
    AppendAiMessage { text: String },

    /// Switch the session to chat
    MarkDocumentReady { name: String },
}

impl Effect {
    pub fn notify(title: impl Into<String>, description: impl Into<String>) -> Self {
        Effect::Notify(Notification::info(title, description))
    }

    pub fn notify_error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Effect::Notify(Notification::destructive(title, description))
    }
}
