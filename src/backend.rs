//! Question-answering backend client
//!
//! Provides a common interface over the remote HTTP API so the flows can run
//! against the real service or a mock.

mod error;
mod http;
mod types;

pub use error::BackendError;
pub use http::HttpBackend;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// The remote API the client talks to
#[async_trait]
pub trait Backend: Send + Sync {
    /// Stream a PDF to `/upload-pdf`, reporting transfer progress
    async fn upload_pdf(
        &self,
        upload: &PdfUpload,
        progress: ProgressSender,
    ) -> Result<UploadReceipt, BackendError>;

    /// Poll server-side processing of an accepted upload
    async fn processing_status(&self, job_id: &str) -> Result<ProcessingStatus, BackendError>;

    /// Ask a question about the current document
    async fn ask(&self, question: &str) -> Result<Answer, BackendError>;

    /// Ask for a better answer to `question` than `response`
    async fn retry(&self, question: &str, response: &str) -> Result<ImprovedAnswer, BackendError>;

    /// Record feedback. The response body is ignored.
    async fn feedback(&self, report: &FeedbackReport) -> Result<(), BackendError>;
}

/// Logging wrapper for backends
pub struct LoggingBackend {
    inner: Arc<dyn Backend>,
}

impl LoggingBackend {
    pub fn new(inner: Arc<dyn Backend>) -> Self {
        Self { inner }
    }
}

fn log_outcome<T>(endpoint: &str, start: std::time::Instant, result: &Result<T, BackendError>) {
    let duration = start.elapsed();
    match result {
        Ok(_) => {
            tracing::info!(
                endpoint,
                duration_ms = %duration.as_millis(),
                "Backend request completed"
            );
        }
        Err(e) => {
            tracing::error!(
                endpoint,
                duration_ms = %duration.as_millis(),
                error = %e.message,
                status = ?e.status,
                http = e.kind.is_http(),
                "Backend request failed"
            );
        }
    }
}

#[async_trait]
impl Backend for LoggingBackend {
    async fn upload_pdf(
        &self,
        upload: &PdfUpload,
        progress: ProgressSender,
    ) -> Result<UploadReceipt, BackendError> {
        let start = std::time::Instant::now();
        let result = self.inner.upload_pdf(upload, progress).await;
        log_outcome("/upload-pdf", start, &result);
        result
    }

    async fn processing_status(&self, job_id: &str) -> Result<ProcessingStatus, BackendError> {
        let start = std::time::Instant::now();
        let result = self.inner.processing_status(job_id).await;
        if let Ok(status) = &result {
            tracing::debug!(job_id, status = ?status.status, "Upload status polled");
        }
        log_outcome("/upload-status", start, &result);
        result
    }

    async fn ask(&self, question: &str) -> Result<Answer, BackendError> {
        let start = std::time::Instant::now();
        let result = self.inner.ask(question).await;
        log_outcome("/ask", start, &result);
        result
    }

    async fn retry(&self, question: &str, response: &str) -> Result<ImprovedAnswer, BackendError> {
        let start = std::time::Instant::now();
        let result = self.inner.retry(question, response).await;
        log_outcome("/retry", start, &result);
        result
    }

    async fn feedback(&self, report: &FeedbackReport) -> Result<(), BackendError> {
        let start = std::time::Instant::now();
        let result = self.inner.feedback(report).await;
        log_outcome("/feedback", start, &result);
        result
    }
}
