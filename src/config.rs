//! Client configuration from the environment

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the question-answering service
    pub backend_url: String,
    pub db_path: PathBuf,
    /// Delay between `/upload-status` polls
    pub poll_interval: Duration,
    /// Whole-request timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Emit logs as JSON lines instead of text
    pub log_json: bool,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let backend_url = lookup("PDF_CHAT_BACKEND_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let db_path = lookup("PDF_CHAT_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".pdf-chat").join("session.db")
            },
            PathBuf::from,
        );

        let poll_interval = lookup("PDF_CHAT_POLL_INTERVAL_MS")
            .and_then(|ms| ms.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map_or(
                Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
                Duration::from_millis,
            );

        let request_timeout = lookup("PDF_CHAT_REQUEST_TIMEOUT_SECS")
            .and_then(|secs| secs.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let log_json = lookup("PDF_CHAT_LOG_JSON")
            .is_some_and(|v| matches!(v.trim(), "1" | "true" | "yes"));

        Self {
            backend_url,
            db_path,
            poll_interval,
            request_timeout,
            log_json,
        }
    }
}
