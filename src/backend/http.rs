//! reqwest implementation of the backend API

use super::types::{
    Answer, AskRequest, FeedbackReport, ImprovedAnswer, PdfUpload, ProcessingStatus,
    ProgressSender, RetryRequest, UploadReceipt,
};
use super::{Backend, BackendError};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_util::io::ReaderStream;

const PDF_MEDIA_TYPE: &str = "application/pdf";

/// HTTP client for the question-answering backend
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// `timeout` of `None` means requests wait as long as the backend takes
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, BackendError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| BackendError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `/upload-status/{job_id}` with the id as one encoded path segment
    fn status_url(&self, job_id: &str) -> Result<Url, BackendError> {
        let mut url = Url::parse(&self.endpoint("/upload-status"))
            .map_err(|e| BackendError::invalid_request(format!("Invalid backend URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| BackendError::invalid_request("Backend URL cannot take a path"))?
            .push(job_id);
        Ok(url)
    }

    /// Read the body, map non-success statuses to errors, parse JSON
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| BackendError::decode(format!("Failed to parse response: {e} - body: {body}")))
    }
}

fn transport_error(e: &reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::network(format!("Request timeout: {e}"))
    } else if e.is_connect() {
        BackendError::network(format!("Connection failed: {e}"))
    } else {
        BackendError::unknown(format!("Request failed: {e}"))
    }
}

/// Pull `detail` out of a FastAPI-style error body, else use the raw body
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}

fn classify_error(status: StatusCode, body: &str) -> BackendError {
    let detail = error_detail(body);
    let err = match status.as_u16() {
        400..=499 => BackendError::invalid_request(detail),
        500..=599 => BackendError::server_error(detail),
        _ => BackendError::unknown(detail),
    };
    err.with_status(status.as_u16())
}

fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    u8::try_from((sent.saturating_mul(100) / total).min(100)).unwrap_or(100)
}

#[async_trait]
impl Backend for HttpBackend {
    async fn upload_pdf(
        &self,
        upload: &PdfUpload,
        progress: ProgressSender,
    ) -> Result<UploadReceipt, BackendError> {
        let file = tokio::fs::File::open(&upload.path).await.map_err(|e| {
            BackendError::io(format!("Failed to open {}: {e}", upload.path.display()))
        })?;
        let total = file
            .metadata()
            .await
            .map_err(|e| BackendError::io(format!("Failed to stat {}: {e}", upload.path.display())))?
            .len();

        let _ = progress.send(0);
        let mut sent: u64 = 0;
        let stream = ReaderStream::new(file).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                sent += bytes.len() as u64;
                let _ = progress.send(percent(sent, total));
            }
            chunk
        });

        let part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(upload.name.clone())
            .mime_str(PDF_MEDIA_TYPE)
            .map_err(|e| BackendError::unknown(format!("Invalid media type: {e}")))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("/upload-pdf"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        Self::decode(response).await
    }

    async fn processing_status(&self, job_id: &str) -> Result<ProcessingStatus, BackendError> {
        let response = self
            .client
            .get(self.status_url(job_id)?)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        Self::decode(response).await
    }

    async fn ask(&self, question: &str) -> Result<Answer, BackendError> {
        let response = self
            .client
            .post(self.endpoint("/ask"))
            .json(&AskRequest { question })
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        Self::decode(response).await
    }

    async fn retry(&self, question: &str, response: &str) -> Result<ImprovedAnswer, BackendError> {
        let http_response = self
            .client
            .post(self.endpoint("/retry"))
            .json(&RetryRequest { question, response })
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        Self::decode(http_response).await
    }

    async fn feedback(&self, report: &FeedbackReport) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.endpoint("/feedback"))
            .json(report)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status, &body))
    }
}
