//! Error types for the memory module.

use thiserror::Error;

/// Result type alias for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Errors that can occur while reading or writing durable state.
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Unsupported repair memory version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
