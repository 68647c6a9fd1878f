//! Stack reification
//!
//! - `unwind`: the transport object carrying a thrown value or pause plus raw frame info
//! - `frame`: reconstructed activation records, stored in an index-addressed arena
//! - `continuation`: single-shot resumable snapshot built from an unwind
//!
//! `Outcome` is what `Runtime::run` and `Continuation::resume` hand back.

pub mod continuation;
pub mod frame;
pub mod unwind;

#[cfg(test)]
mod tests;

pub use continuation::Continuation;
pub use frame::{Frame, FrameId, FunctionRef};
pub use unwind::{Completion, FrameInfo, Signal, Unwind};

use crate::runtime::Value;

/// Result of running or resuming instrumented code
#[derive(Debug)]
pub enum Outcome {
    Completed(Value),
    Paused(Continuation),
    Failed(Failure),
}

/// A program error that escaped the outermost frame
#[derive(Debug)]
pub struct Failure {
    pub error: Value,
    /// Frames as they were when the error escaped
    pub continuation: Continuation,
}

impl Outcome {
    pub fn from_unwind(unwind: Unwind) -> Outcome {
        let error = unwind.thrown().cloned();
        let continuation = Continuation::from_unwind(unwind);
        match error {
            Some(error) => Outcome::Failed(Failure {
                error,
                continuation,
            }),
            None => Outcome::Paused(continuation),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Outcome::Paused(_))
    }

    /// Completed value, if any
    pub fn value(&self) -> Option<&Value> {
        match self {
            Outcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    /// The continuation of a pause or failure
    pub fn continuation(&self) -> Option<&Continuation> {
        match self {
            Outcome::Completed(_) => None,
            Outcome::Paused(continuation) => Some(continuation),
            Outcome::Failed(failure) => Some(&failure.continuation),
        }
    }

    pub fn into_continuation(self) -> Option<Continuation> {
        match self {
            Outcome::Completed(_) => None,
            Outcome::Paused(continuation) => Some(continuation),
            Outcome::Failed(failure) => Some(failure.continuation),
        }
    }
}
