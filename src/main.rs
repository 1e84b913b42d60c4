//! pdf-chat - terminal client for a PDF question-answering service
//!
//! Upload a PDF, ask questions about it, and rate or retry the answers.
//! The conversation survives restarts in a local SQLite file.

mod backend;
mod config;
mod db;
mod notification;
mod runtime;
mod session;
mod state_machine;
mod ui;

use backend::{HttpBackend, LoggingBackend};
use config::ClientConfig;
use db::Database;
use runtime::{ChatRuntime, RuntimeOptions};
use session::{DatabaseStorage, KeyValueStore, SessionStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env();

    // Logs go to stderr so they never interleave with the REPL
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pdf_chat=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;
    let storage: Arc<dyn KeyValueStore> = Arc::new(DatabaseStorage::new(db));
    let store = Arc::new(SessionStore::load(storage));

    let http = HttpBackend::new(&config.backend_url, config.request_timeout)?;
    tracing::info!(url = %config.backend_url, timeout = ?config.request_timeout, "Backend configured");
    let backend = Arc::new(LoggingBackend::new(Arc::new(http)));

    let runtime = Arc::new(ChatRuntime::new(
        store,
        backend,
        RuntimeOptions {
            poll_interval: config.poll_interval,
        },
    ));

    ui::run(runtime).await?;
    Ok(())
}
