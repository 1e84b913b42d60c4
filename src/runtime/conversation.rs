//! Conversation flow: ask questions, retry answers

use super::{ChatRuntime, FlowError, UiEvent};
use crate::backend::Backend;
use crate::notification::Notification;
use crate::session::{Message, MessageId, Metrics, NewMessage};

/// Shown in place of an answer when `/ask` fails
pub const FALLBACK_ANSWER: &str = "Sorry, there was an error processing your question.";

/// What a retry did to its message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Text and metrics were replaced and feedback cleared
    Improved,
    /// The backend returned no usable text
    Unchanged,
    /// The request failed; the message is untouched
    Failed,
    /// The message is unknown, from the user, or has no question
    NotRetryable,
    /// A retry for this message is already in flight
    AlreadyRetrying,
}

impl<B: Backend> ChatRuntime<B> {
    /// Ask a question. On backend failure the fallback answer is appended
    /// instead, so every accepted question gets exactly one reply.
    pub async fn send(&self, question: &str) -> Result<Message, FlowError> {
        if question.trim().is_empty() {
            self.notify(Notification::destructive(
                "Empty Question",
                "Please type a question first.",
            ));
            return Err(FlowError::EmptyQuestion);
        }

        let user_message = self.store.append(NewMessage::user(question));
        self.publish(UiEvent::MessageAppended(user_message));

        let draft = match self.backend.ask(question).await {
            Ok(answer) => {
                let metrics = answer.metrics();
                NewMessage::ai(answer.answer, metrics).with_question(question)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error sending message");
                NewMessage::ai(FALLBACK_ANSWER, Metrics::default())
            }
        };

        let reply = self.store.append(draft);
        self.publish(UiEvent::MessageAppended(reply.clone()));
        Ok(reply)
    }

    /// Ask the backend to improve an AI answer in place
    pub async fn retry(&self, id: MessageId) -> RetryOutcome {
        let Some(message) = self.store.message(id) else {
            tracing::debug!(message_id = %id, "Retry for unknown message");
            return RetryOutcome::NotRetryable;
        };
        let Some(question) = message.question.as_deref().filter(|_| message.can_retry()) else {
            tracing::debug!(message_id = %id, "Message has no question to retry");
            return RetryOutcome::NotRetryable;
        };

        let Some(marker) = self.store.try_mark_retrying(id) else {
            tracing::debug!(message_id = %id, "Retry already in flight");
            return RetryOutcome::AlreadyRetrying;
        };
        self.publish(UiEvent::RetryStarted(id));

        let outcome = match self.backend.retry(question, &message.text).await {
            Ok(improved) => match improved.text() {
                Some(text) => {
                    let text = text.to_string();
                    let metrics = improved.metrics();
                    let updated = self.store.update(id, |m| {
                        m.text = text;
                        m.metrics = Some(metrics);
                        m.feedback = None;
                    });
                    match updated {
                        Some(updated) => {
                            tracing::info!(message_id = %id, "Answer improved");
                            self.publish(UiEvent::MessageUpdated(updated));
                            RetryOutcome::Improved
                        }
                        // The session was reset while the request ran
                        None => RetryOutcome::Unchanged,
                    }
                }
                None => {
                    tracing::info!(message_id = %id, "Retry returned no improved answer");
                    RetryOutcome::Unchanged
                }
            },
            Err(e) => {
                tracing::error!(message_id = %id, error = %e, "Error retrying message");
                RetryOutcome::Failed
            }
        };

        drop(marker);
        self.publish(UiEvent::RetryFinished(id));
        outcome
    }
}
