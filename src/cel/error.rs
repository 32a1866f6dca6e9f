//! Errors raised by condition evaluation

use thiserror::Error;

/// Condition evaluation errors.
///
/// Any of these is treated fail-closed by callers: the affected rule or
/// derived role simply does not match, and the failure is recorded in the
/// decision metadata.
#[derive(Error, Debug)]
pub enum CelError {
    #[error("expression failed to compile: {0}")]
    Compilation(String),

    #[error("expression failed to evaluate: {0}")]
    Evaluation(String),

    #[error("expression did not return a boolean")]
    NonBooleanResult,
}

/// Result type for condition evaluation
pub type Result<T> = std::result::Result<T, CelError>;
