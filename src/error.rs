//! Error types for the curing engine.

use thiserror::Error;

/// Unified error type for engine operations.
///
/// Configuration and indexing errors are programmer/setup errors and should
/// abort the run. Transport errors are fatal to the step on every rank.
/// I/O errors from statistics dumps propagate to the caller without
/// poisoning engine state.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid engine or reaction configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Out-of-range reaction lookup
    #[error("reaction index {index} out of range (registered: {len})")]
    BadIndex { index: usize, len: usize },

    /// Transport failure (peer gone, tag mismatch, truncated record stream)
    #[error("communication error: {0}")]
    Comm(String),

    /// I/O failure while writing the pair-distance log or a CSV export
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn config(message: impl Into<String>) -> Self {
        EngineError::Config(message.into())
    }

    pub fn comm(message: impl Into<String>) -> Self {
        EngineError::Comm(message.into())
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
