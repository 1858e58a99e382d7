//! Error types for VMRK summarization

use thiserror::Error;

/// Errors that abort processing of a single marker file
#[derive(Debug, Error)]
pub enum VmrkError {
    #[error("Invalid stimulus code {payload:?} on line {line}")]
    InvalidStimulusCode { line: usize, payload: String },

    #[error("Invalid timestamp {field:?} on line {line}")]
    InvalidTimestamp { line: usize, field: String },

    #[error("Not enough trials to compute {0}")]
    EmptySample(String),

    #[error("Undefined ratio for {0}: denominator is zero")]
    UndefinedRatio(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
