//! Events that drive the upload flow

use super::state::{FileCandidate, FileSource};

/// Events that trigger upload state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    // User events
    FileChosen {
        candidate: FileCandidate,
        source: FileSource,
    },
    UploadRequested,

    // Transfer events
    TransferProgress {
        percent: u8,
    },
    UploadAccepted {
        job_id: Option<String>,
    },

    // Processing events
    ProcessingComplete,

    /// Transfer or processing failed; `reason` is shown to the user
    UploadFailed {
        reason: String,
    },
}
