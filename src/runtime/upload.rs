//! Upload flow: select, transmit, wait for processing, announce

use super::{ChatRuntime, FlowError, UiEvent};
use crate::backend::{Backend, BackendError, JobState, ProcessingStatus};
use crate::notification::Notification;
use crate::session::{Metrics, NewMessage};
use crate::state_machine::{
    transition, Effect, FileCandidate, FileSource, TransitionError, UploadEvent,
};
use std::path::Path;
use tokio::sync::mpsc;

impl<B: Backend> ChatRuntime<B> {
    /// Choose a file through the picker or by dropping it
    pub async fn select_file(&self, path: &Path, source: FileSource) -> Result<(), FlowError> {
        let candidate = FileCandidate::from_path(path);
        tracing::debug!(name = %candidate.name, media_type = ?candidate.media_type, ?source, "File chosen");
        self.dispatch(UploadEvent::FileChosen { candidate, source })
            .await
    }

    /// Upload the selected file and wait until the backend has processed it
    pub async fn upload(&self) -> Result<(), FlowError> {
        self.dispatch(UploadEvent::UploadRequested).await
    }

    /// Run one user event and every event its effects generate
    async fn dispatch(&self, event: UploadEvent) -> Result<(), FlowError> {
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let effects = match self.apply_upload_event(current_event) {
                Ok(effects) => effects,
                Err(e) => {
                    if e == TransitionError::UploadBusy {
                        self.notify(Notification::destructive(
                            "Upload In Progress",
                            "Wait for the current upload to finish first.",
                        ));
                    } else {
                        tracing::error!(error = %e, "Upload transition rejected");
                    }
                    return Err(e.into());
                }
            };

            for effect in effects {
                if let Some(generated_event) = self.execute_upload_effect(effect).await {
                    events_to_process.push(generated_event);
                }
            }
        }

        Ok(())
    }

    /// Apply a transition under the state lock. The lock is never held
    /// across an await.
    fn apply_upload_event(&self, event: UploadEvent) -> Result<Vec<Effect>, TransitionError> {
        let mut state = self.upload_state.lock().unwrap();
        let result = transition(&state, event)?;

        if result.new_state != *state {
            *state = result.new_state.clone();
            self.publish(UiEvent::UploadStateChanged(result.new_state));
        }

        Ok(result.effects)
    }

    async fn execute_upload_effect(&self, effect: Effect) -> Option<UploadEvent> {
        match effect {
            Effect::Notify(notification) => {
                self.notify(notification);
                None
            }

            Effect::TransmitFile { upload } => {
                tracing::info!(name = %upload.name, "Uploading PDF");
                let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
                let transfer = self.backend.upload_pdf(&upload, progress_tx);
                tokio::pin!(transfer);

                let result = loop {
                    tokio::select! {
                        Some(percent) = progress_rx.recv() => {
                            self.record_progress(percent);
                        }
                        result = &mut transfer => break result,
                    }
                };
                while let Ok(percent) = progress_rx.try_recv() {
                    self.record_progress(percent);
                }

                Some(match result {
                    Ok(receipt) => {
                        tracing::info!(
                            name = %upload.name,
                            job_id = ?receipt.job_id,
                            message = ?receipt.message,
                            "Upload accepted"
                        );
                        UploadEvent::UploadAccepted {
                            job_id: receipt.job_id,
                        }
                    }
                    Err(e) => {
                        tracing::error!(name = %upload.name, error = %e, "Error uploading file");
                        UploadEvent::UploadFailed {
                            reason: upload_failure_reason(&e),
                        }
                    }
                })
            }

            // Without a job id the upload response itself means "processed"
            Effect::AwaitProcessing { job_id: None } => Some(UploadEvent::ProcessingComplete),

            Effect::AwaitProcessing {
                job_id: Some(job_id),
            } => Some(self.poll_processing(&job_id).await),

            Effect::AppendAiMessage { text } => {
                let message = self
                    .store
                    .append(NewMessage::ai(text, Metrics::default()));
                self.publish(UiEvent::MessageAppended(message));
                None
            }

            Effect::MarkDocumentReady { name } => {
                self.store.mark_document_ready(name.clone());
                self.publish(UiEvent::DocumentReady { name });
                None
            }
        }
    }

    fn record_progress(&self, percent: u8) {
        if let Err(e) = self.apply_upload_event(UploadEvent::TransferProgress { percent }) {
            tracing::debug!(error = %e, "Dropping progress update");
        }
    }

    async fn poll_processing(&self, job_id: &str) -> UploadEvent {
        let mut polls = 0u32;
        loop {
            tokio::time::sleep(self.options.poll_interval).await;
            polls += 1;

            match self.backend.processing_status(job_id).await {
                Ok(ProcessingStatus {
                    status: JobState::Processing,
                    ..
                }) => {
                    tracing::debug!(job_id, polls, "Document still processing");
                }
                Ok(ProcessingStatus {
                    status: JobState::Ready,
                    ..
                }) => {
                    tracing::info!(job_id, polls, "Document processed");
                    return UploadEvent::ProcessingComplete;
                }
                Ok(ProcessingStatus {
                    status: JobState::Failed,
                    detail,
                }) => {
                    tracing::error!(job_id, detail = ?detail, "Document processing failed");
                    return UploadEvent::UploadFailed {
                        reason: detail.unwrap_or_else(|| "Processing failed".to_string()),
                    };
                }
                Err(e) => {
                    tracing::error!(job_id, error = %e, "Processing status check failed");
                    return UploadEvent::UploadFailed {
                        reason: format!("Could not check processing status: {e}"),
                    };
                }
            }
        }
    }
}

fn upload_failure_reason(error: &BackendError) -> String {
    match error.status {
        Some(status) if error.message.is_empty() => format!("Upload failed with status {status}"),
        Some(status) => format!("Upload failed with status {status}: {}", error.message),
        None => error.message.clone(),
    }
}
