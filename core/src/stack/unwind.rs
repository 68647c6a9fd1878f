//! Reified unwind: the transport object for throws and pauses
//!
//! Every instrumented function boundary an unwind crosses appends one raw
//! `FrameInfo` tuple. Nothing is built eagerly; `recreate_frames` turns the
//! queued tuples into `Frame`s when someone actually wants to look at the
//! stack or resume it.

use tracing::{debug, warn};

use crate::registry::RegistryHandle;
use crate::runtime::scope::Chain;
use crate::runtime::Value;

use super::frame::{Frame, FrameId, FunctionRef};

/// Result of evaluating anything that may throw or pause
pub type Completion<T> = Result<T, Box<Unwind>>;

/* ===================== Signal ===================== */

/// What is travelling up the stack
#[derive(Debug, Clone)]
pub enum Signal {
    /// A value thrown by the program (or by the runtime on its behalf)
    Error(Value),
    /// Synthetic pause raised at the node with this position index
    Pause { at: usize },
}

/* ===================== Frame Info ===================== */

/// Raw frame-construction tuple captured at one function boundary
#[derive(Debug, Clone)]
pub struct FrameInfo {
    pub this: Value,
    pub args: Vec<Value>,
    /// Frame chain at the moment the unwind left the function
    pub chain: Chain,
    /// Last position index recorded by the function
    pub last: usize,
    pub namespace: String,
    /// Index of the function node
    pub index: usize,
    pub registry: RegistryHandle,
}

/* ===================== Unwind ===================== */

#[derive(Debug)]
pub struct Unwind {
    pub signal: Signal,
    frame_info: Vec<FrameInfo>,
    frames: Vec<Frame>,
    /// Innermost frame
    top: Option<FrameId>,
    /// Outermost frame reconstructed so far
    last: Option<FrameId>,
}

impl Unwind {
    fn new(signal: Signal) -> Self {
        Unwind {
            signal,
            frame_info: Vec::new(),
            frames: Vec::new(),
            top: None,
            last: None,
        }
    }

    /// Wrap a thrown value
    pub fn error(value: Value) -> Box<Unwind> {
        Box::new(Self::new(Signal::Error(value)))
    }

    /// Raise a pause at position `at`
    pub fn pause(at: usize) -> Box<Unwind> {
        Box::new(Self::new(Signal::Pause { at }))
    }

    pub fn is_pause(&self) -> bool {
        matches!(self.signal, Signal::Pause { .. })
    }

    /// The thrown value, if this is not a pause
    pub fn thrown(&self) -> Option<&Value> {
        match &self.signal {
            Signal::Error(value) => Some(value),
            Signal::Pause { .. } => None,
        }
    }

    /// Queue one frame's raw state; called at each boundary crossed
    pub fn store_frame_info(&mut self, info: FrameInfo) {
        self.frame_info.push(info);
    }

    pub fn pending_frame_info(&self) -> usize {
        self.frame_info.len()
    }

    pub fn top(&self) -> Option<FrameId> {
        self.top
    }

    pub fn last(&self) -> Option<FrameId> {
        self.last
    }

    pub fn frame(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(id.0)
    }

    /// Turn queued frame info into linked frames, oldest (innermost) first.
    /// Calling again with nothing queued does nothing.
    pub fn recreate_frames(&mut self) {
        let infos = std::mem::take(&mut self.frame_info);
        if !infos.is_empty() {
            debug!(count = infos.len(), "recreating frames");
        }
        for info in infos {
            self.create_and_shift_frame(info);
        }
    }

    fn create_and_shift_frame(&mut self, info: FrameInfo) -> FrameId {
        let (scope, pending) = info.chain.split();
        let cache = scope.cache.clone();
        let origin = match info.registry.borrow().tree(&info.namespace, info.index) {
            Ok(tree) => Some(FunctionRef {
                tree,
                index: info.index,
            }),
            Err(err) => {
                warn!(%err, "frame origin not found in registry");
                None
            }
        };

        let pc = if self.top.is_none() {
            match self.signal {
                Signal::Pause { at } => Some(at),
                Signal::Error(_) => Some(info.last),
            }
        } else if cache.borrow().contains_key(&info.last) {
            // The recorded operation already finished: resume after its subtree
            origin.as_ref().map(|o| o.tree.end(info.last))
        } else {
            Some(info.last)
        };

        let frame = Frame {
            scope,
            pending,
            cache,
            pc,
            this: info.this,
            arguments: info.args,
            parent: None,
            origin,
            registry: Some(info.registry),
        };
        self.push_outermost(frame)
    }

    /// Append an already built frame as the new outermost frame
    pub fn shift_frame(&mut self, frame: Frame) -> FrameId {
        self.recreate_frames();
        self.push_outermost(frame)
    }

    fn push_outermost(&mut self, mut frame: Frame) -> FrameId {
        if frame.pc.is_none() {
            warn!("frame without pc found");
        }
        frame.parent = None;
        let id = FrameId(self.frames.len());
        self.frames.push(frame);
        match self.last {
            None => {
                self.top = Some(id);
                self.last = Some(id);
            }
            Some(last) => {
                self.frames[last.0].parent = Some(id);
                self.last = Some(id);
            }
        }
        id
    }

    /// Detach the outermost frame, returning its id.
    ///
    /// The frame stays in the arena but is no longer reachable from `top`.
    pub fn unshift_frame(&mut self) -> Option<FrameId> {
        self.recreate_frames();
        let outermost = self.last?;
        let child = self
            .frames
            .iter()
            .position(|f| f.parent == Some(outermost))
            .map(FrameId);
        match child {
            Some(child) => {
                self.frames[child.0].parent = None;
                self.last = Some(child);
            }
            None => {
                self.top = None;
                self.last = None;
            }
        }
        Some(outermost)
    }

    /// Hand the frame arena over to a continuation
    pub(crate) fn into_parts(mut self) -> (Signal, Vec<Frame>, Option<FrameId>) {
        self.recreate_frames();
        (self.signal, self.frames, self.top)
    }
}
