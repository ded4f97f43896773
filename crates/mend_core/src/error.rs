//! Error types for the core module.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while preparing or running a pipeline.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to parse config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Phase '{phase}' failed: {message}")]
    Phase { phase: String, message: String },

    #[error("Memory error: {0}")]
    Memory(#[from] mend_memory::MemoryError),

    #[error("Runner error: {0}")]
    Runner(#[from] mend_runner::RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A terminal pipeline failure. `Display` is the escalation message.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminalFailure {
    #[error(
        "BLOCKED: pre-build scan found {} unresolved critical issue(s): {}. Fix them manually and re-run.",
        .issues.len(),
        .issues.join("; ")
    )]
    Blocked { issues: Vec<String> },

    #[error(
        "NO_FIX: build attempt {attempt} failed with no recognized, fixable error pattern ({detail}). \
         Operator intervention required; see {output_log}."
    )]
    UnrecognizedFailure {
        attempt: u32,
        detail: String,
        output_log: String,
    },

    #[error(
        "RETRY_EXHAUSTED: build still failing after {attempts} of {max_retries} attempts despite applied fixes. \
         Operator intervention required; see {output_log}."
    )]
    RetryExhausted {
        attempts: u32,
        max_retries: u32,
        output_log: String,
    },

    #[error("DEPLOY_FAILED: deploy command exited with {exit_code}: {detail}")]
    DeployFailed { exit_code: i32, detail: String },
}
