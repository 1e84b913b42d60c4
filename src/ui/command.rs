//! REPL command parsing

use crate::runtime::{FeedbackDraft, FeedbackTag};
use crate::session::{FeedbackType, MessageId};
use std::path::PathBuf;
use thiserror::Error;

/// Arguments of `/comment`, applied on top of the prefilled dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentArgs {
    pub id: MessageId,
    /// Replaces the prefilled tags when non-empty
    pub tags: Vec<FeedbackTag>,
    /// Replaces the prefilled text when present
    pub text: Option<String>,
    /// Invoke the dialog's retry action after submitting
    pub retry: bool,
}

impl CommentArgs {
    pub fn apply_to(&self, prefilled: FeedbackDraft) -> FeedbackDraft {
        let mut draft = if self.tags.is_empty() {
            prefilled
        } else {
            self.tags
                .iter()
                .fold(FeedbackDraft::new().with_text(prefilled.text), |d, tag| {
                    d.with_tag(*tag)
                })
        };
        if let Some(text) = &self.text {
            draft = draft.with_text(text.clone());
        }
        draft
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    Select(PathBuf),
    Drop(PathBuf),
    Upload(Option<PathBuf>),
    Vote { id: MessageId, kind: FeedbackType },
    Comment(CommentArgs),
    Retry(MessageId),
    ToggleDeveloperMode,
    History,
    Clear,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command /{0}. Type /help for a list.")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Not a message id: {0}")]
    InvalidId(String),
    #[error("Unknown tag #{0}. Known tags: {known}", known = known_tags())]
    UnknownTag(String),
}

fn known_tags() -> String {
    FeedbackTag::ALL
        .iter()
        .map(|t| format!("#{}", t.slug()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse one input line. Returns `None` for an empty line.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Ok(None);
    }

    let Some(rest) = line.trim_start().strip_prefix('/') else {
        return Ok(Some(Command::Ask(line.to_string())));
    };

    let (name, args) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(name, args)| (name, args.trim()));

    let command = match name {
        "select" => Command::Select(path_arg(args, "/select <path>")?),
        "drop" => Command::Drop(path_arg(args, "/drop <path>")?),
        "upload" => Command::Upload((!args.is_empty()).then(|| PathBuf::from(args))),
        "up" => Command::Vote {
            id: id_arg(args, "/up <id>")?,
            kind: FeedbackType::Up,
        },
        "down" => Command::Vote {
            id: id_arg(args, "/down <id>")?,
            kind: FeedbackType::Down,
        },
        "comment" => Command::Comment(comment_args(args)?),
        "retry" => Command::Retry(id_arg(args, "/retry <id>")?),
        "dev" => Command::ToggleDeveloperMode,
        "history" => Command::History,
        "clear" => Command::Clear,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(Some(command))
}

fn path_arg(args: &str, usage: &'static str) -> Result<PathBuf, CommandError> {
    if args.is_empty() {
        return Err(CommandError::Usage(usage));
    }
    Ok(PathBuf::from(args))
}

fn id_arg(args: &str, usage: &'static str) -> Result<MessageId, CommandError> {
    if args.is_empty() {
        return Err(CommandError::Usage(usage));
    }
    args.parse()
        .map_err(|_| CommandError::InvalidId(args.to_string()))
}

/// `<id> [#tag ...] [text] [--retry]`
fn comment_args(args: &str) -> Result<CommentArgs, CommandError> {
    const USAGE: &str = "/comment <id> [#tag ...] [text] [--retry]";

    let mut words = args.split_whitespace().peekable();
    let id = id_arg(words.next().unwrap_or_default(), USAGE)?;

    let mut tags = Vec::new();
    while let Some(slug) = words.peek().and_then(|w| w.strip_prefix('#')) {
        let tag = FeedbackTag::from_slug(slug)
            .ok_or_else(|| CommandError::UnknownTag(slug.to_string()))?;
        if !tags.contains(&tag) {
            tags.push(tag);
        }
        words.next();
    }

    let mut rest: Vec<&str> = words.collect();
    let retry = rest.last() == Some(&"--retry");
    if retry {
        rest.pop();
    }
    let text = (!rest.is_empty()).then(|| rest.join(" "));

    Ok(CommentArgs {
        id,
        tags,
        text,
        retry,
    })
}
