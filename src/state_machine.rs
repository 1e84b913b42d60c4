//! Upload flow state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.
//! The runtime feeds events in and executes the returned effects.

mod effect;
mod event;
mod state;
mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::UploadEvent;
pub use state::{FileCandidate, FileSource, UploadState};
pub use transition::{transition, TransitionError};
