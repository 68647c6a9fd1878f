//! Stack reification for a closure-based scripting language
//!
//! Programs are rewritten so that every call frame can be captured when an
//! error or pause unwinds through it, then rebuilt and resumed later by the
//! stepping interpreter.

pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod interpreter;
pub mod registry;
pub mod rewriter;
pub mod runtime;
pub mod stack;
pub mod syntax;

pub use config::Config;
pub use error::ReifyError;
pub use interpreter::{Breakpoints, HaltHook, Mode, StepOnce};
pub use registry::{AstRegistry, RegistryHandle};
pub use runtime::{Runtime, Value};
pub use stack::{Continuation, Frame, Outcome};
