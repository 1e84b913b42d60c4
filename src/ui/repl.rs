//! Interactive terminal loop
//!
//! Reads commands from stdin and spawns each flow as its own task, so a
//! question can be answered while a retry is still outstanding. A separate
//! task prints whatever the runtime broadcasts.

use super::command::{self, Command, CommentArgs};
use super::view;
use crate::backend::Backend;
use crate::runtime::{ChatRuntime, FeedbackDraft, RetryOutcome, UiEvent};
use crate::session::{MessageId, View};
use crate::state_machine::{FileSource, UploadState};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};

pub async fn run<B: Backend + 'static>(runtime: Arc<ChatRuntime<B>>) -> std::io::Result<()> {
    let printer = tokio::spawn(print_events(Arc::clone(&runtime), runtime.subscribe()));

    println!("{}", view::session(&runtime.store().snapshot(), |_| false));
    println!("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match command::parse(&line) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => dispatch(&runtime, command),
            Err(e) => println!("{e}"),
        }
    }

    printer.abort();
    tracing::info!("REPL finished");
    Ok(())
}

fn dispatch<B: Backend + 'static>(runtime: &Arc<ChatRuntime<B>>, command: Command) {
    match command {
        Command::Help => println!("{}", view::help()),
        Command::History => {
            let store = runtime.store();
            println!("{}", view::session(&store.snapshot(), |id| store.is_retrying(id)));
        }
        Command::ToggleDeveloperMode => {
            runtime.toggle_developer_mode();
        }
        Command::Clear => {
            // Refusal is already broadcast as a notification
            let _ = runtime.reset_session();
        }
        Command::Ask(question) if runtime.store().view() == View::Upload => {
            tracing::debug!(len = question.len(), "Question before any document");
            println!("Upload a PDF first: /select <path>, then /upload.");
        }
        command => {
            let runtime = Arc::clone(runtime);
            tokio::spawn(async move { run_flow(&runtime, command).await });
        }
    }
}

async fn run_flow<B: Backend>(runtime: &ChatRuntime<B>, command: Command) {
    let result = match command {
        Command::Ask(question) => runtime.send(&question).await.map(|_| ()),
        Command::Select(path) => runtime.select_file(&path, FileSource::Picker).await,
        Command::Drop(path) => runtime.select_file(&path, FileSource::Drop).await,
        Command::Upload(path) => upload(runtime, path).await,
        Command::Vote { id, kind } => runtime.vote(id, kind).await.map(|_| ()),
        Command::Comment(args) => comment(runtime, args).await,
        Command::Retry(id) => {
            report_retry(id, runtime.retry(id).await);
            Ok(())
        }
        other => {
            tracing::warn!(?other, "Command is handled inline");
            Ok(())
        }
    };

    if let Err(e) = result {
        // Every flow error has been shown to the user as a notification
        tracing::debug!(error = %e, "Flow rejected");
    }
}

async fn upload<B: Backend>(
    runtime: &ChatRuntime<B>,
    path: Option<std::path::PathBuf>,
) -> Result<(), crate::runtime::FlowError> {
    if let Some(path) = path {
        runtime.select_file(&path, FileSource::Picker).await?;
        // A rejected file has already been reported
        if !matches!(runtime.upload_state(), UploadState::FileSelected { .. }) {
            return Ok(());
        }
    }
    runtime.upload().await
}

async fn comment<B: Backend>(
    runtime: &ChatRuntime<B>,
    args: CommentArgs,
) -> Result<(), crate::runtime::FlowError> {
    let prefilled = runtime
        .store()
        .message(args.id)
        .map(|m| FeedbackDraft::for_message(&m))
        .unwrap_or_default();
    let draft = args.apply_to(prefilled);

    // Retry stands in for submitting; an improved answer starts without feedback
    if args.retry {
        match runtime.retry_from_dialog(args.id, &draft).await {
            Ok(result) => report_retry(args.id, result),
            Err(e) => println!("{e}"),
        }
        return Ok(());
    }

    let outcome = runtime.comment(args.id, &draft).await?;
    if outcome.retry_available {
        println!("Not what you needed? /comment {} --retry asks again.", args.id);
    }
    Ok(())
}

fn report_retry(id: MessageId, outcome: RetryOutcome) {
    match outcome {
        RetryOutcome::Improved => {}
        RetryOutcome::Unchanged => println!("No better answer for message {id}."),
        RetryOutcome::Failed => println!("Retry of message {id} failed."),
        RetryOutcome::NotRetryable => println!("Message {id} cannot be retried."),
        RetryOutcome::AlreadyRetrying => println!("Message {id} is already being retried."),
    }
}

async fn print_events<B: Backend>(
    runtime: Arc<ChatRuntime<B>>,
    mut events: broadcast::Receiver<UiEvent>,
) {
    loop {
        match events.recv().await {
            Ok(event) => render_event(&runtime, &event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Terminal fell behind on events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn render_event<B: Backend>(runtime: &ChatRuntime<B>, event: &UiEvent) {
    let store = runtime.store();
    let developer_mode = store.developer_mode();

    match event {
        UiEvent::Notify(n) => println!("{}", view::notification(n)),
        UiEvent::MessageAppended(m) => println!("{}", view::message(m, developer_mode, false)),
        // Updates from a retry are shown once the retry finishes
        UiEvent::MessageUpdated(m) if store.is_retrying(m.id) => {}
        UiEvent::MessageUpdated(m) => println!("{}", view::message(m, developer_mode, false)),
        UiEvent::RetryStarted(id) | UiEvent::RetryFinished(id) => {
            if let Some(m) = store.message(*id) {
                let retrying = matches!(event, UiEvent::RetryStarted(_));
                println!("{}", view::message(&m, developer_mode, retrying));
            }
        }
        UiEvent::UploadStateChanged(state) => {
            if let Some(line) = view::upload_state(state) {
                if matches!(state, UploadState::Transmitting { .. }) {
                    print!("\r{line}");
                    let _ = std::io::stdout().flush();
                } else {
                    println!("\r{line}");
                }
            }
        }
        UiEvent::DocumentReady { name } => {
            println!("Chatting about {name}. Ask a question.");
        }
        UiEvent::DeveloperModeChanged(enabled) => {
            println!("Developer mode {}", if *enabled { "on" } else { "off" });
        }
        UiEvent::SessionReset => {
            println!("{}", view::session(&store.snapshot(), |_| false));
        }
    }
}
