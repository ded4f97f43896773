//! Error types for the pattern catalog.

use thiserror::Error;

/// Result type alias for catalog operations.
pub type PatternResult<T> = Result<T, PatternError>;

/// Errors raised while compiling a pattern catalog.
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("Invalid regex for pattern '{key}': {source}")]
    InvalidRegex {
        key: String,
        #[source]
        source: regex::Error,
    },

    #[error("Duplicate pattern key: {0}")]
    DuplicateKey(String),

    #[error("Pattern key must not be empty")]
    EmptyKey,

    #[error("Fix '{fix}' of pattern '{key}' has confidence {confidence} outside [0, 1]")]
    InvalidConfidence {
        key: String,
        fix: String,
        confidence: f64,
    },
}
