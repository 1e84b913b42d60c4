//! Session state: the conversation, developer mode and document status
//!
//! The [`SessionStore`] is the single source of truth for everything the
//! flows mutate. It is owned by the entry point and shared by handle.

mod message;
mod persist;
mod store;

pub use message::{Feedback, FeedbackType, Message, MessageId, Metrics, NewMessage, Sender};
pub use persist::{DatabaseStorage, KeyValueStore};
pub use store::{DocumentStatus, Session, SessionStore, View};
