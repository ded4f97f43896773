//! Command runner trait and types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::command::CommandSpec;
use crate::error::RunnerResult;

/// Result of running a subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The command as it was run
    pub command: String,
    /// Exit code (-1 when terminated by a signal)
    pub exit_code: i32,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Execution start time
    pub started_at: DateTime<Utc>,
    /// Execution end time
    pub finished_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Check if execution was successful (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Get combined output (stdout + stderr).
    pub fn combined_output(&self) -> String {
        if self.stdout.is_empty() {
            self.stderr.clone()
        } else if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.ends_with('\n') {
            format!("{}{}", self.stdout, self.stderr)
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Runs subprocesses to completion.
///
/// No timeout is applied; callers that need a bound impose it themselves.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> RunnerResult<ExecutionResult>;
}
