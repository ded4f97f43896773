//! Error types for the runner module.

use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur while running subprocesses.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to spawn '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Remediation '{name}' exited with code {exit_code}: {output}")]
    RemediationFailed {
        name: String,
        exit_code: i32,
        output: String,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
