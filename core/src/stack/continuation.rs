//! Continuations: resumable snapshots of a paused call chain

use tracing::debug;

use crate::error::ReifyError;
use crate::interpreter;
use crate::runtime::{Runtime, Value};

use super::frame::{Frame, FrameId};
use super::unwind::{Signal, Unwind};
use super::Outcome;

/// Single-shot continuation over an arena of reconstructed frames.
///
/// `resume` consumes it. Use `copy` first to resume the same pause point
/// more than once.
#[derive(Debug, Clone)]
pub struct Continuation {
    frames: Vec<Frame>,
    /// Frame in which the unwind was triggered
    current: Option<FrameId>,
    error: Option<Value>,
}

impl Continuation {
    /// Build a continuation from an unwind, reconstructing its frames
    pub fn from_unwind(unwind: Unwind) -> Continuation {
        let (signal, frames, top) = unwind.into_parts();
        let error = match signal {
            Signal::Error(value) => Some(value),
            Signal::Pause { .. } => None,
        };
        Continuation {
            frames,
            current: top,
            error,
        }
    }

    /// The error this continuation was created from, if it did not pause normally
    pub fn error(&self) -> Option<&Value> {
        self.error.as_ref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Innermost frame
    pub fn current_frame(&self) -> Option<&Frame> {
        self.current.and_then(|id| self.frames.get(id.0))
    }

    /// Frames from innermost to outermost
    pub fn frames(&self) -> Vec<&Frame> {
        self.frame_ids()
            .into_iter()
            .filter_map(|id| self.frames.get(id.0))
            .collect()
    }

    fn frame_ids(&self) -> Vec<FrameId> {
        let mut ids = Vec::new();
        let mut current = self.current;
        while let Some(id) = current {
            if ids.len() > self.frames.len() || ids.contains(&id) {
                break;
            }
            ids.push(id);
            current = self.frames.get(id.0).and_then(|f| f.parent);
        }
        ids
    }

    /// Independent duplicate of the whole frame chain
    pub fn copy(&self) -> Continuation {
        Continuation {
            frames: self.frames.iter().map(Frame::deep_copy).collect(),
            current: self.current,
            error: self.error.clone(),
        }
    }

    /// Continue the computation.
    ///
    /// Frames are resumed innermost first; each one's result seeds the next
    /// outer frame's cache at its saved position. A new pause or error stops
    /// there and comes back as a fresh continuation holding the interrupted
    /// frame and every frame not yet resumed.
    pub fn resume(self, rt: &mut Runtime) -> Result<Outcome, ReifyError> {
        let Some(current) = self.current_frame() else {
            return Err(ReifyError::Precondition(
                "continuation has no frames".to_string(),
            ));
        };
        if current.function().is_none() {
            return Err(ReifyError::Precondition("frame has no AST".to_string()));
        }
        if current.pc.is_none() {
            return Err(ReifyError::Precondition("frame has no pc".to_string()));
        }
        let order = self.frame_ids();
        if let Some(frame) = self.frames().into_iter().find(|f| !f.is_resumable()) {
            return Err(ReifyError::Precondition(format!(
                "frame {} cannot be resumed",
                frame.describe()
            )));
        }

        let frames = self.frames;
        rt.with_debug_support(|rt| Ok(resume_frames(rt, frames, &order)))
    }
}

fn resume_frames(rt: &mut Runtime, frames: Vec<Frame>, order: &[FrameId]) -> Outcome {
    let mut slots: Vec<Option<Frame>> = frames.into_iter().map(Some).collect();
    let mut previous: Option<Value> = None;

    for (pos, id) in order.iter().enumerate() {
        let Some(mut frame) = slots.get_mut(id.0).and_then(Option::take) else {
            continue;
        };
        // Disconnect so the frame can be relinked if it pauses again
        frame.parent = None;
        if let (Some(value), Some(pc)) = (&previous, frame.pc) {
            frame.cache.borrow_mut().insert(pc, value.clone());
        }
        debug!(frame = %frame.describe(), "resuming frame");

        match interpreter::run_from_pc(rt, frame) {
            Ok(value) => previous = Some(value),
            Err(unwind) => {
                let mut unwind: Unwind = *unwind;
                for rest in &order[pos + 1..] {
                    if let Some(frame) = slots.get_mut(rest.0).and_then(Option::take) {
                        unwind.shift_frame(frame);
                    }
                }
                return Outcome::from_unwind(unwind);
            }
        }
    }

    Outcome::Completed(previous.unwrap_or(Value::Undefined))
}
