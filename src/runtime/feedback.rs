//! Feedback flow: votes, tagged comments, and retry from the dialog

use super::{ChatRuntime, FlowError, RetryOutcome, UiEvent};
use crate::backend::{Backend, FeedbackReport};
use crate::notification::Notification;
use crate::session::{Feedback, FeedbackType, Message, MessageId};
use chrono::Utc;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagPolarity {
    Positive,
    Negative,
}

/// Predefined quick-feedback tags offered by the feedback dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackTag {
    Helpful,
    Accurate,
    ClearExplanation,
    TooVague,
    Inaccurate,
    NotActionable,
}

impl FeedbackTag {
    pub const ALL: [FeedbackTag; 6] = [
        FeedbackTag::Helpful,
        FeedbackTag::Accurate,
        FeedbackTag::ClearExplanation,
        FeedbackTag::TooVague,
        FeedbackTag::Inaccurate,
        FeedbackTag::NotActionable,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FeedbackTag::Helpful => "Helpful",
            FeedbackTag::Accurate => "Accurate",
            FeedbackTag::ClearExplanation => "Clear explanation",
            FeedbackTag::TooVague => "Too vague",
            FeedbackTag::Inaccurate => "Inaccurate",
            FeedbackTag::NotActionable => "Not actionable",
        }
    }

    /// Short form typed on the command line, e.g. `#too-vague`
    pub fn slug(self) -> &'static str {
        match self {
            FeedbackTag::Helpful => "helpful",
            FeedbackTag::Accurate => "accurate",
            FeedbackTag::ClearExplanation => "clear-explanation",
            FeedbackTag::TooVague => "too-vague",
            FeedbackTag::Inaccurate => "inaccurate",
            FeedbackTag::NotActionable => "not-actionable",
        }
    }

    pub fn polarity(self) -> TagPolarity {
        match self {
            FeedbackTag::Helpful | FeedbackTag::Accurate | FeedbackTag::ClearExplanation => {
                TagPolarity::Positive
            }
            FeedbackTag::TooVague | FeedbackTag::Inaccurate | FeedbackTag::NotActionable => {
                TagPolarity::Negative
            }
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        let slug = slug.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|t| t.slug() == slug)
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label.trim())
    }
}

impl fmt::Display for FeedbackTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Feedback dialog contents before submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackDraft {
    tags: Vec<FeedbackTag>,
    pub text: String,
}

impl FeedbackDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefill from a message's stored comment, splitting a leading
    /// `[Tag, Tag] ` prefix back into tags when every label is known
    pub fn for_message(message: &Message) -> Self {
        message
            .feedback
            .as_ref()
            .and_then(|f| f.comment.as_deref())
            .map(Self::parse)
            .unwrap_or_default()
    }

    fn parse(comment: &str) -> Self {
        let tagged = comment
            .strip_prefix('[')
            .and_then(|rest| rest.split_once(']'))
            .and_then(|(labels, text)| {
                let tags = labels
                    .split(", ")
                    .map(FeedbackTag::from_label)
                    .collect::<Option<Vec<_>>>()?;
                Some(Self {
                    tags,
                    text: text.trim_start().to_string(),
                })
            });

        tagged.unwrap_or_else(|| Self {
            tags: Vec::new(),
            text: comment.to_string(),
        })
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: FeedbackTag) -> Self {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    #[cfg(test)]
    pub fn tags(&self) -> &[FeedbackTag] {
        &self.tags
    }

    /// The dialog offers a retry once any negative tag is selected
    pub fn offers_retry(&self) -> bool {
        self.tags
            .iter()
            .any(|t| t.polarity() == TagPolarity::Negative)
    }

    /// `"[A, B] text"` in selection order, trimmed. Empty when nothing was entered.
    pub fn compose(&self) -> String {
        let labels: Vec<&str> = self.tags.iter().map(|t| t.label()).collect();
        let composed = if labels.is_empty() {
            self.text.clone()
        } else {
            format!("[{}] {}", labels.join(", "), self.text)
        };
        composed.trim().to_string()
    }
}

/// Result of submitting the feedback dialog
#[derive(Debug, Clone, PartialEq)]
pub struct CommentOutcome {
    pub message: Message,
    /// Whether the dialog should now offer a retry
    pub retry_available: bool,
}

impl<B: Backend> ChatRuntime<B> {
    /// Thumbs up or down. Keeps any earlier comment.
    pub async fn vote(&self, id: MessageId, kind: FeedbackType) -> Result<Message, FlowError> {
        self.check_feedback_target(id)?;
        let updated = self
            .store
            .update(id, |m| {
                m.feedback = Some(Feedback::vote(m.feedback.as_ref(), kind, Utc::now()));
            })
            .ok_or_else(|| self.unknown_message(id))?;

        self.publish(UiEvent::MessageUpdated(updated.clone()));
        self.notify(Notification::info(
            "Feedback Submitted",
            format!("Thank you for your {kind} feedback!"),
        ));

        self.report_feedback(FeedbackReport {
            message_id: id.get(),
            feedback_type: Some(kind),
            comment: None,
        })
        .await;

        Ok(updated)
    }

    /// Submit the feedback dialog. Keeps any earlier vote.
    pub async fn comment(
        &self,
        id: MessageId,
        draft: &FeedbackDraft,
    ) -> Result<CommentOutcome, FlowError> {
        self.check_feedback_target(id)?;
        let composed = draft.compose();
        let comment = (!composed.is_empty()).then_some(composed);

        let stored = comment.clone();
        let updated = self
            .store
            .update(id, |m| {
                m.feedback = Some(Feedback::comment(m.feedback.as_ref(), stored, Utc::now()));
            })
            .ok_or_else(|| self.unknown_message(id))?;

        self.publish(UiEvent::MessageUpdated(updated.clone()));
        self.notify(Notification::info(
            "Feedback Submitted",
            "Thank you for your feedback!",
        ));

        self.report_feedback(FeedbackReport {
            message_id: id.get(),
            feedback_type: None,
            comment,
        })
        .await;

        Ok(CommentOutcome {
            message: updated,
            retry_available: draft.offers_retry(),
        })
    }

    /// The dialog's "retry" action, available only with a negative tag
    pub async fn retry_from_dialog(
        &self,
        id: MessageId,
        draft: &FeedbackDraft,
    ) -> Result<RetryOutcome, FlowError> {
        if !draft.offers_retry() {
            return Err(FlowError::RetryNotOffered);
        }
        Ok(self.retry(id).await)
    }

    /// Feedback controls only exist on AI answers without a retry in flight
    fn check_feedback_target(&self, id: MessageId) -> Result<(), FlowError> {
        let message = self
            .store
            .message(id)
            .ok_or_else(|| self.unknown_message(id))?;

        let reason = if !message.is_ai() {
            "Only answers can be rated."
        } else if self.store.is_retrying(id) {
            "Wait for the retry of this answer to finish."
        } else {
            return Ok(());
        };

        tracing::debug!(message_id = %id, reason, "Feedback refused");
        self.notify(Notification::destructive("Feedback Unavailable", reason));
        Err(FlowError::FeedbackUnavailable(id))
    }

    /// Local state is already updated; a failed report is only logged
    async fn report_feedback(&self, report: FeedbackReport) {
        if let Err(e) = self.backend.feedback(&report).await {
            tracing::warn!(message_id = report.message_id, error = %e, "Error storing feedback");
        }
    }
}
