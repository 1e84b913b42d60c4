//! Mock implementations for testing
//!
//! These mocks enable flow testing without real I/O.

use super::{ChatRuntime, RuntimeOptions, UiEvent};
use crate::backend::{
    Answer, Backend, BackendError, FeedbackReport, ImprovedAnswer, JobState, PdfUpload,
    ProcessingStatus, ProgressSender, UploadReceipt,
};
use crate::notification::Notification;
use crate::session::{KeyValueStore, SessionStore};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

// ============================================================================
// In-memory storage
// ============================================================================

/// Key-value storage backed by a map, with write counting and failure injection
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    writes: Mutex<HashMap<String, usize>>,
    fail_writes: Mutex<bool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value without counting it as a write
    pub fn insert_raw(&self, key: &str, raw: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), raw.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn write_count(&self, key: &str) -> usize {
        self.writes.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }
}

impl KeyValueStore for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, String> {
        Ok(self.raw(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), String> {
        if *self.fail_writes.lock().unwrap() {
            return Err("storage quota exceeded".to_string());
        }
        *self.writes.lock().unwrap().entry(key.to_string()).or_default() += 1;
        self.insert_raw(key, value);
        Ok(())
    }
}

// ============================================================================
// Mock backend
// ============================================================================

/// Mock backend that returns queued responses and records requests
#[derive(Default)]
pub struct MockBackend {
    uploads: Mutex<VecDeque<Result<UploadReceipt, BackendError>>>,
    statuses: Mutex<VecDeque<Result<ProcessingStatus, BackendError>>>,
    answers: Mutex<VecDeque<Result<Answer, BackendError>>>,
    improvements: Mutex<VecDeque<Result<ImprovedAnswer, BackendError>>>,
    feedback_results: Mutex<VecDeque<Result<(), BackendError>>>,

    upload_delay: Mutex<Option<Duration>>,
    retry_delay: Mutex<Option<Duration>>,

    upload_requests: Mutex<Vec<PdfUpload>>,
    status_requests: Mutex<Vec<String>>,
    questions: Mutex<Vec<String>>,
    retry_requests: Mutex<Vec<(String, String)>>,
    feedback_requests: Mutex<Vec<FeedbackReport>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_upload(&self, result: Result<UploadReceipt, BackendError>) {
        self.uploads.lock().unwrap().push_back(result);
    }

    pub fn queue_status(&self, result: Result<ProcessingStatus, BackendError>) {
        self.statuses.lock().unwrap().push_back(result);
    }

    pub fn queue_answer(&self, result: Result<Answer, BackendError>) {
        self.answers.lock().unwrap().push_back(result);
    }

    pub fn queue_improved(&self, result: Result<ImprovedAnswer, BackendError>) {
        self.improvements.lock().unwrap().push_back(result);
    }

    /// Feedback succeeds unless a result is queued
    pub fn queue_feedback(&self, result: Result<(), BackendError>) {
        self.feedback_results.lock().unwrap().push_back(result);
    }

    pub fn set_upload_delay(&self, delay: Duration) {
        *self.upload_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_retry_delay(&self, delay: Duration) {
        *self.retry_delay.lock().unwrap() = Some(delay);
    }

    pub fn uploads(&self) -> Vec<PdfUpload> {
        self.upload_requests.lock().unwrap().clone()
    }

    pub fn status_polls(&self) -> Vec<String> {
        self.status_requests.lock().unwrap().clone()
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }

    pub fn retry_requests(&self) -> Vec<(String, String)> {
        self.retry_requests.lock().unwrap().clone()
    }

    pub fn feedback_reports(&self) -> Vec<FeedbackReport> {
        self.feedback_requests.lock().unwrap().clone()
    }
}

fn next_or_missing<T>(queue: &Mutex<VecDeque<Result<T, BackendError>>>) -> Result<T, BackendError> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(BackendError::network("No mock response queued")))
}

#[async_trait]
impl Backend for MockBackend {
    async fn upload_pdf(
        &self,
        upload: &PdfUpload,
        progress: ProgressSender,
    ) -> Result<UploadReceipt, BackendError> {
        self.upload_requests.lock().unwrap().push(upload.clone());
        let delay = *self.upload_delay.lock().unwrap();

        for percent in [0u8, 50, 100] {
            let _ = progress.send(percent);
            if let Some(delay) = delay {
                tokio::time::sleep(delay / 3).await;
            }
        }

        next_or_missing(&self.uploads)
    }

    async fn processing_status(&self, job_id: &str) -> Result<ProcessingStatus, BackendError> {
        self.status_requests.lock().unwrap().push(job_id.to_string());
        next_or_missing(&self.statuses)
    }

    async fn ask(&self, question: &str) -> Result<Answer, BackendError> {
        self.questions.lock().unwrap().push(question.to_string());
        next_or_missing(&self.answers)
    }

    async fn retry(&self, question: &str, response: &str) -> Result<ImprovedAnswer, BackendError> {
        self.retry_requests
            .lock()
            .unwrap()
            .push((question.to_string(), response.to_string()));
        let delay = *self.retry_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        next_or_missing(&self.improvements)
    }

    async fn feedback(&self, report: &FeedbackReport) -> Result<(), BackendError> {
        self.feedback_requests.lock().unwrap().push(report.clone());
        self.feedback_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub type TestRuntime = ChatRuntime<MockBackend>;

/// Runtime over an empty in-memory session with a fast poll interval
pub fn test_runtime() -> (TestRuntime, Arc<MockBackend>, Arc<MemoryStorage>) {
    let kv = Arc::new(MemoryStorage::new());
    let store = Arc::new(SessionStore::load(kv.clone()));
    let backend = Arc::new(MockBackend::new());
    let runtime = ChatRuntime::new(
        store,
        backend.clone(),
        RuntimeOptions {
            poll_interval: Duration::from_millis(1),
        },
    );
    (runtime, backend, kv)
}

pub fn answer(value: Value) -> Answer {
    serde_json::from_value(value).unwrap()
}

pub fn processing_status(status: JobState) -> ProcessingStatus {
    ProcessingStatus {
        status,
        detail: None,
    }
}

/// Everything broadcast so far
pub fn drain(rx: &mut broadcast::Receiver<UiEvent>) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn notifications(events: &[UiEvent]) -> Vec<&Notification> {
    events
        .iter()
        .filter_map(|e| match e {
            UiEvent::Notify(n) => Some(n),
            _ => None,
        })
        .collect()
}
