//! Wire types for the question-answering backend

use crate::session::{FeedbackType, Metrics};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Receives upload progress in percent (0..=100)
pub type ProgressSender = mpsc::UnboundedSender<u8>;

/// A validated PDF ready to be streamed to `/upload-pdf`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfUpload {
    pub path: PathBuf,
    pub name: String,
}

/// Body of `/ask`
#[derive(Debug, Serialize)]
pub struct AskRequest<'a> {
    pub question: &'a str,
}

/// Body of `/retry`
#[derive(Debug, Serialize)]
pub struct RetryRequest<'a> {
    pub question: &'a str,
    pub response: &'a str,
}

/// Body of `/feedback`. Absent fields are sent as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackReport {
    pub message_id: u64,
    pub feedback_type: Option<FeedbackType>,
    pub comment: Option<String>,
}

/// Scores as the backend names them
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WireMetrics {
    #[serde(rename = "Bleu_1", default)]
    pub bleu_1: Option<f64>,
    #[serde(rename = "Bleu_2", default)]
    pub bleu_2: Option<f64>,
    #[serde(rename = "Bleu_3", default)]
    pub bleu_3: Option<f64>,
    #[serde(rename = "Bleu_4", default)]
    pub bleu_4: Option<f64>,
    #[serde(rename = "ROUGE_L", default)]
    pub rouge_l: Option<f64>,
}

impl WireMetrics {
    pub fn to_metrics(&self) -> Metrics {
        Metrics::from_scores(
            [self.bleu_1, self.bleu_2, self.bleu_3, self.bleu_4],
            self.rouge_l,
        )
    }
}

fn metrics_or_zero(wire: Option<&WireMetrics>) -> Metrics {
    wire.map(WireMetrics::to_metrics).unwrap_or_default()
}

/// Response of `/ask`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Answer {
    pub answer: String,
    #[serde(default)]
    pub metrics: Option<WireMetrics>,
}

impl Answer {
    pub fn metrics(&self) -> Metrics {
        metrics_or_zero(self.metrics.as_ref())
    }
}

/// Response of `/retry`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImprovedAnswer {
    #[serde(default)]
    pub improved_answer: Option<String>,
    #[serde(default)]
    pub metrics: Option<WireMetrics>,
}

impl ImprovedAnswer {
    /// The replacement text, if the backend produced a usable one
    pub fn text(&self) -> Option<&str> {
        self.improved_answer.as_deref().filter(|t| !t.is_empty())
    }

    pub fn metrics(&self) -> Metrics {
        metrics_or_zero(self.metrics.as_ref())
    }
}

/// Response of `/upload-pdf`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub message: Option<String>,
    /// Present when the backend indexes asynchronously
    #[serde(default)]
    pub job_id: Option<String>,
}

/// Server-side indexing state reported by `/upload-status/{job_id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Processing,
    Ready,
    Failed,
}

/// Response of `/upload-status/{job_id}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProcessingStatus {
    pub status: JobState,
    #[serde(default)]
    pub detail: Option<String>,
}
