//! Crate-level error type
//!
//! Only failures of the engine itself live here. Values thrown by scripts
//! travel as `Signal::Error` inside an unwind and surface as
//! `Outcome::Failed`, never as a `ReifyError`.

use thiserror::Error;

use crate::rewriter::RewriteError;
use crate::syntax::ParseError;

#[derive(Debug, Error)]
pub enum ReifyError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    /// A (namespace, index) pair that no rewrite pass ever assigned
    #[error("no node registered at index {index} in namespace '{namespace}'")]
    Lookup { namespace: String, index: usize },

    /// Resuming or reconstructing without the data it needs
    #[error("cannot resume: {0}")]
    Precondition(String),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}
