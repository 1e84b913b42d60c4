//! Text rendering of the session for the terminal

use crate::notification::Notification;
use crate::runtime::FeedbackTag;
use crate::session::{DocumentStatus, Message, MessageId, Sender, Session, View};
use crate::state_machine::UploadState;
use chrono::Local;
use std::fmt::Write;

const FEEDBACK_PREVIEW_CHARS: usize = 30;
const DEV_FEEDBACK_PREVIEW_CHARS: usize = 15;
const PROGRESS_BAR_WIDTH: usize = 20;

/// First `max` characters of `text`, with an ellipsis when cut
fn preview(text: &str, max: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

pub fn notification(n: &Notification) -> String {
    let marker = if n.is_destructive() { "!!" } else { "--" };
    format!("{marker} {n}")
}

pub fn progress_bar(percent: u8) -> String {
    let percent = usize::from(percent.min(100));
    let filled = percent * PROGRESS_BAR_WIDTH / 100;
    format!(
        "[{}{}] {percent:>3}%",
        "#".repeat(filled),
        ".".repeat(PROGRESS_BAR_WIDTH - filled)
    )
}

/// One-line status for the upload panel. `None` when there is nothing to show.
pub fn upload_state(state: &UploadState) -> Option<String> {
    let bar = state.progress().map(progress_bar).unwrap_or_default();
    match state {
        UploadState::Idle => None,
        UploadState::FileSelected { file } => {
            Some(format!("Selected {}. Type /upload to send it.", file.name))
        }
        UploadState::Transmitting { file, .. } => Some(format!("Uploading {} {bar}", file.name)),
        UploadState::ServerProcessing { file, .. } => {
            Some(format!("Processing {} {bar}", file.name))
        }
    }
}

/// A message card. While a retry is in flight the text is replaced and the
/// feedback and developer sections are hidden.
pub fn message(message: &Message, developer_mode: bool, retrying: bool) -> String {
    card(message, developer_mode, retrying, false)
}

/// `full_feedback` adds the untruncated comment and its time to the
/// developer section
fn card(message: &Message, developer_mode: bool, retrying: bool, full_feedback: bool) -> String {
    let mut out = String::new();
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");
    let _ = writeln!(out, "[{}] {} {}", message.id, message.sender, time);

    if retrying {
        let _ = write!(out, "    Retrying...");
        return out;
    }

    for line in message.text.lines() {
        let _ = writeln!(out, "    {line}");
    }

    if message.sender == Sender::Ai {
        if let Some(feedback) = &message.feedback {
            if let Some(kind) = feedback.kind {
                let _ = writeln!(out, "    Rated: {kind}");
            }
            if let Some(comment) = feedback.comment.as_deref().filter(|c| !c.is_empty()) {
                let _ = writeln!(
                    out,
                    "    Feedback: \"{}\"",
                    preview(comment, FEEDBACK_PREVIEW_CHARS)
                );
            }
        }

        if developer_mode {
            let metrics = message.metrics.clone().unwrap_or_default();
            let _ = writeln!(
                out,
                "    BLEU-1: {}  BLEU-2: {}  BLEU-3: {}  BLEU-4: {}",
                metrics.bleu1, metrics.bleu2, metrics.bleu3, metrics.bleu4
            );
            let _ = writeln!(out, "    ROGUE Score: {}", metrics.rogue);
            if let Some(feedback) = &message.feedback {
                let kind = feedback.kind.map(|k| k.to_string()).unwrap_or_default();
                let comment = feedback
                    .comment
                    .as_deref()
                    .map(|c| format!(" ({})", preview(c, DEV_FEEDBACK_PREVIEW_CHARS)))
                    .unwrap_or_default();
                let _ = writeln!(out, "    User Feedback: {kind}{comment}");
                if full_feedback {
                    if let Some(comment) = &feedback.comment {
                        let _ = writeln!(out, "    Feedback Comment: {comment}");
                    }
                    let _ = writeln!(out, "    Feedback Given: {}", feedback.timestamp.to_rfc3339());
                }
            }
            let _ = writeln!(out, "    Timestamp: {}", message.timestamp.to_rfc3339());
        }
    }

    out.truncate(out.trim_end().len());
    out
}

/// Everything currently in the session, for startup and `/history`.
/// Developer mode shows feedback in full here.
pub fn session(session: &Session, retrying: impl Fn(MessageId) -> bool) -> String {
    match session.view() {
        View::Upload => {
            "No document yet. Choose a PDF with /select <path> (or /drop <path>), then /upload."
                .to_string()
        }
        View::Chat => {
            let mut out = String::new();
            if let DocumentStatus::Ready { name } = &session.document {
                let _ = writeln!(out, "Chatting about {name}");
            }
            for m in &session.messages {
                let rendered = card(m, session.developer_mode, retrying(m.id), true);
                let _ = writeln!(out, "{rendered}");
            }
            out.truncate(out.trim_end().len());
            out
        }
    }
}

pub fn help() -> String {
    let tags = FeedbackTag::ALL
        .iter()
        .map(|t| format!("#{} ({})", t.slug(), t.label()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "\
<text>                          ask a question about the document
/select <path>                  choose a PDF
/drop <path>                    drop a PDF
/upload [path]                  upload the chosen (or given) PDF
/up <id>, /down <id>            rate an answer
/comment <id> [#tag ...] [text] [--retry]
                                leave feedback; --retry asks again instead of
                                submitting (needs a negative tag)
/retry <id>                     ask for a better answer
/dev                            toggle developer mode
/history                        show the conversation
/clear                          start over with a new document
/quit                           exit

Tags: {tags}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Feedback, FeedbackType, Metrics, NewMessage};
    use crate::state_machine::FileCandidate;
    use std::path::Path;
    use chrono::Utc;

    fn ai(id: u64, text: &str) -> Message {
        NewMessage::ai(text, Metrics::from_scores([Some(0.5), None, None, Some(0.126)], Some(0.3)))
            .with_question("q")
            .into_message(MessageId(id), Utc::now())
    }

    #[test]
    fn test_preview_counts_characters() {
        assert_eq!(preview("short", 30), "short");
        assert_eq!(preview("ééééé", 3), "ééé...");
        assert_eq!(preview(&"x".repeat(31), 30), format!("{}...", "x".repeat(30)));
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0), format!("[{}]   0%", ".".repeat(20)));
        assert_eq!(progress_bar(50), format!("[{}{}]  50%", "#".repeat(10), ".".repeat(10)));
        assert_eq!(progress_bar(255), format!("[{}] 100%", "#".repeat(20)));
    }

    #[test]
    fn test_message_plain() {
        let rendered = message(&ai(2, "The answer."), false, false);
        assert!(rendered.starts_with("[2] AI "));
        assert!(rendered.contains("    The answer."));
        assert!(!rendered.contains("BLEU"));
    }

    #[test]
    fn test_message_retrying_hides_text() {
        let mut m = ai(2, "The answer.");
        m.feedback = Some(Feedback::vote(None, FeedbackType::Up, Utc::now()));

        let rendered = message(&m, true, true);
        assert!(rendered.contains("Retrying..."));
        assert!(!rendered.contains("The answer."));
        assert!(!rendered.contains("Rated"));
        assert!(!rendered.contains("BLEU"));
    }

    #[test]
    fn test_message_feedback_preview() {
        let mut m = ai(2, "The answer.");
        let comment = "[Too vague] the answer never cites a page number";
        m.feedback = Some(Feedback::comment(None, Some(comment.to_string()), Utc::now()));

        let rendered = message(&m, false, false);
        assert!(rendered.contains("Feedback: \"[Too vague] the answer never c...\""));
        assert!(!rendered.contains("Rated"));
    }

    #[test]
    fn test_message_developer_block() {
        let mut m = ai(2, "The answer.");
        let vote = Feedback::vote(None, FeedbackType::Down, Utc::now());
        m.feedback = Some(Feedback::comment(
            Some(&vote),
            Some("wrong section entirely".to_string()),
            Utc::now(),
        ));

        let rendered = message(&m, true, false);
        assert!(rendered.contains("BLEU-1: 0.50  BLEU-2: 0.00  BLEU-3: 0.00  BLEU-4: 0.13"));
        assert!(rendered.contains("ROGUE Score: 0.30"));
        assert!(rendered.contains("User Feedback: down (wrong section e...)"));
        assert!(rendered.contains(&format!("Timestamp: {}", m.timestamp.to_rfc3339())));
    }

    #[test]
    fn test_history_shows_full_feedback_in_developer_mode() {
        let mut m = ai(2, "The answer.");
        let comment = "[Inaccurate] the termination clause is on page 12, not page 3";
        let given = Utc::now();
        m.feedback = Some(Feedback::comment(None, Some(comment.to_string()), given));

        let mut s = Session {
            document: DocumentStatus::Ready {
                name: "a.pdf".to_string(),
            },
            messages: vec![m.clone()],
            developer_mode: true,
        };
        let rendered = session(&s, |_| false);
        assert!(rendered.contains(&format!("Feedback Comment: {comment}")));
        assert!(rendered.contains(&format!("Feedback Given: {}", given.to_rfc3339())));

        // Live cards and non-developer history stay short
        assert!(!message(&m, true, false).contains("Feedback Comment"));
        s.developer_mode = false;
        assert!(!session(&s, |_| false).contains("Feedback Comment"));
    }

    #[test]
    fn test_user_message_has_no_controls() {
        let m = NewMessage::user("hi").into_message(MessageId(1), Utc::now());
        let rendered = message(&m, true, false);
        assert!(rendered.starts_with("[1] User "));
        assert!(!rendered.contains("BLEU"));
    }

    #[test]
    fn test_session_view_gate() {
        let mut s = Session::default();
        assert!(session(&s, |_| false).starts_with("No document yet"));

        s.document = DocumentStatus::Ready {
            name: "a.pdf".to_string(),
        };
        s.messages.push(ai(1, "Ready."));
        let rendered = session(&s, |_| false);
        assert!(rendered.starts_with("Chatting about a.pdf"));
        assert!(rendered.contains("Ready."));
    }

    #[test]
    fn test_upload_state_lines() {
        let candidate = FileCandidate::from_path(Path::new("/tmp/a.pdf"));
        assert_eq!(upload_state(&UploadState::Idle), None);
        assert!(upload_state(&UploadState::Transmitting {
            file: candidate.clone().into(),
            progress: 40
        })
        .unwrap()
        .ends_with(" 40%"));
        assert_eq!(
            upload_state(&UploadState::ServerProcessing {
                file: candidate.into(),
                job_id: None
            })
            .unwrap(),
            format!("Processing a.pdf {}", progress_bar(100))
        );
    }

    #[test]
    fn test_notification_marker() {
        assert_eq!(
            notification(&Notification::destructive("No File", "Please select a PDF file to upload.")),
            "!! No File: Please select a PDF file to upload."
        );
        assert_eq!(notification(&Notification::info("Done", "")), "-- Done");
    }
}
