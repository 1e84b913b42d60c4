//! Pure state transition function

use super::state::{FileCandidate, FileSource, SelectedFile};
use super::{Effect, UploadEvent, UploadState};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: UploadState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: UploadState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("An upload is already in progress")]
    UploadBusy,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Text of the AI message appended once a document is ready
pub fn processed_document_text(name: &str) -> String {
    format!("I've processed the document \"{name}\". How can I help you with it?")
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs. All I/O is
/// described by the returned effects.
pub fn transition(
    state: &UploadState,
    event: UploadEvent,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // File selection
        // ============================================================
        (
            UploadState::Transmitting { .. } | UploadState::ServerProcessing { .. },
            UploadEvent::FileChosen { .. } | UploadEvent::UploadRequested,
        ) => Err(TransitionError::UploadBusy),

        (
            UploadState::Idle | UploadState::FileSelected { .. },
            UploadEvent::FileChosen { candidate, source },
        ) => Ok(choose_file(state, candidate, source)),

        // ============================================================
        // Upload start
        // ============================================================
        (UploadState::Idle, UploadEvent::UploadRequested) => Ok(TransitionResult::new(
            UploadState::Idle,
        )
        .with_effect(Effect::notify_error(
            "No File",
            "Please select a PDF file to upload.",
        ))),

        (UploadState::FileSelected { file }, UploadEvent::UploadRequested) => Ok(
            TransitionResult::new(UploadState::Transmitting {
                file: file.clone(),
                progress: 0,
            })
            .with_effect(Effect::TransmitFile {
                upload: file.to_upload(),
            }),
        ),

        // ============================================================
        // Transfer
        // ============================================================
        (UploadState::Transmitting { file, progress }, UploadEvent::TransferProgress { percent }) => {
            Ok(TransitionResult::new(UploadState::Transmitting {
                file: file.clone(),
                progress: (*progress).max(percent.min(100)),
            }))
        }

        // Progress that arrives after the transfer finished is dropped
        (_, UploadEvent::TransferProgress { .. }) => Ok(TransitionResult::new(state.clone())),

        (UploadState::Transmitting { file, .. }, UploadEvent::UploadAccepted { job_id }) => Ok(
            TransitionResult::new(UploadState::ServerProcessing {
                file: file.clone(),
                job_id: job_id.clone(),
            })
            .with_effect(Effect::AwaitProcessing { job_id }),
        ),

        // ============================================================
        // Completion and failure
        // ============================================================
        (UploadState::ServerProcessing { file, .. }, UploadEvent::ProcessingComplete) => {
            Ok(TransitionResult::new(UploadState::Idle)
                .with_effect(Effect::AppendAiMessage {
                    text: processed_document_text(&file.name),
                })
                .with_effect(Effect::MarkDocumentReady {
                    name: file.name.clone(),
                })
                .with_effect(Effect::notify(
                    "Processing Complete",
                    format!("\"{}\" is ready.", file.name),
                )))
        }

        (
            UploadState::Transmitting { .. } | UploadState::ServerProcessing { .. },
            UploadEvent::UploadFailed { reason },
        ) => Ok(TransitionResult::new(UploadState::Idle)
            .with_effect(Effect::notify_error("Upload Failed", reason))),

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {state:?} with event {event:?}"
        ))),
    }
}

fn choose_file(state: &UploadState, candidate: FileCandidate, source: FileSource) -> TransitionResult {
    if candidate.is_pdf() {
        let title = match source {
            FileSource::Picker => "PDF Selected",
            FileSource::Drop => "PDF Dropped",
        };
        let description = candidate.name.clone();
        return TransitionResult::new(UploadState::FileSelected {
            file: SelectedFile::from(candidate),
        })
        .with_effect(Effect::notify(title, description));
    }

    // A rejected picker choice replaces the selection with nothing; a
    // rejected drop leaves the current selection alone.
    match source {
        FileSource::Picker => TransitionResult::new(UploadState::Idle)
            .with_effect(Effect::notify_error("Invalid File", "Please select a PDF file.")),
        FileSource::Drop => TransitionResult::new(state.clone())
            .with_effect(Effect::notify_error("Invalid File", "Please drop a PDF file.")),
    }
}
