//! Error types for Prophet checks.

use thiserror::Error;

/// Result type alias for a single check.
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors raised inside a check.
///
/// These never escape Prophet; the scanner records them on the failing
/// check's result.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid ignore pattern '{pattern}': {source}")]
    InvalidIgnore {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Check failed: {0}")]
    Failed(String),

    #[error("Runner error: {0}")]
    Runner(#[from] mend_runner::RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
