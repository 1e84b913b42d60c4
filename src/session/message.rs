//! Conversation message types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Store-allocated message identifier, strictly increasing within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl MessageId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(MessageId)
    }
}

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    #[serde(rename = "AI")]
    Ai,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => f.write_str("User"),
            Sender::Ai => f.write_str("AI"),
        }
    }
}

/// A backend-computed score, kept as the two-decimal string it is displayed as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(String);

impl Score {
    pub fn zero() -> Self {
        Score("0.00".to_string())
    }

    pub fn from_value(value: f64) -> Self {
        Score(format!("{value:.2}"))
    }

    /// `None` means the backend omitted the score
    pub fn from_optional(value: Option<f64>) -> Self {
        value.map_or_else(Self::zero, Self::from_value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// BLEU-1..4 and ROUGE-L for an AI message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub bleu1: Score,
    pub bleu2: Score,
    pub bleu3: Score,
    pub bleu4: Score,
    pub rogue: Score,
}

impl Metrics {
    pub fn from_scores(bleu: [Option<f64>; 4], rouge_l: Option<f64>) -> Self {
        let [b1, b2, b3, b4] = bleu;
        Self {
            bleu1: Score::from_optional(b1),
            bleu2: Score::from_optional(b2),
            bleu3: Score::from_optional(b3),
            bleu4: Score::from_optional(b4),
            rogue: Score::from_optional(rouge_l),
        }
    }
}

/// Thumbs up or down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Up,
    Down,
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackType::Up => f.write_str("up"),
            FeedbackType::Down => f.write_str("down"),
        }
    }
}

impl FromStr for FeedbackType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(FeedbackType::Up),
            "down" => Ok(FeedbackType::Down),
            other => Err(format!("unknown feedback type: {other}")),
        }
    }
}

/// The single feedback record a message carries.
///
/// A vote and a comment share this record: each path only supplies its own
/// field and carries the other one over from the previous record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(rename = "type")]
    pub kind: Option<FeedbackType>,
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Feedback {
    pub fn vote(previous: Option<&Feedback>, kind: FeedbackType, now: DateTime<Utc>) -> Self {
        Self {
            kind: Some(kind),
            comment: previous.and_then(|f| f.comment.clone()),
            timestamp: now,
        }
    }

    pub fn comment(previous: Option<&Feedback>, comment: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            kind: previous.and_then(|f| f.kind),
            comment,
            timestamp: now,
        }
    }
}

/// One turn in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub text: String,
    /// Originating question, only on answers to a tracked question
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    #[serde(default)]
    pub feedback: Option<Feedback>,
}

impl Message {
    pub fn is_ai(&self) -> bool {
        self.sender == Sender::Ai
    }

    /// Only answers that remember their question can be retried
    pub fn can_retry(&self) -> bool {
        self.is_ai() && self.question.is_some()
    }
}

/// A message before the store assigns its id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub sender: Sender,
    pub text: String,
    pub question: Option<String>,
    pub metrics: Option<Metrics>,
}

impl NewMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            question: None,
            metrics: None,
        }
    }

    pub fn ai(text: impl Into<String>, metrics: Metrics) -> Self {
        Self {
            sender: Sender::Ai,
            text: text.into(),
            question: None,
            metrics: Some(metrics),
        }
    }

    #[must_use]
    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    pub(crate) fn into_message(self, id: MessageId, timestamp: DateTime<Utc>) -> Message {
        Message {
            id,
            sender: self.sender,
            text: self.text,
            question: self.question,
            timestamp,
            metrics: self.metrics,
            feedback: None,
        }
    }
}
