//! Mock command runner for testing.
//!
//! Provides a scripted implementation of the CommandRunner trait so that
//! pipeline behavior can be verified without spawning processes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::command::CommandSpec;
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{CommandRunner, ExecutionResult};

/// Predefined response for a command execution.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            duration_ms: 100,
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            duration_ms: 100,
        }
    }
}

/// Mock command runner.
///
/// Responses are chosen by the first rule whose needle occurs in the
/// command line; otherwise the scripted sequence is consumed in order, and
/// its last response repeats once the sequence is exhausted.
#[derive(Clone, Default)]
pub struct MockRunner {
    rules: Arc<RwLock<Vec<(String, MockResponse)>>>,
    responses: Arc<RwLock<Vec<MockResponse>>>,
    response_index: Arc<AtomicUsize>,
    captured_calls: Arc<RwLock<Vec<CommandSpec>>>,
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a response to the scripted sequence.
    pub fn add_response(self, response: MockResponse) -> Self {
        self.responses.write().push(response);
        self
    }

    /// Respond to any command line containing `needle`.
    pub fn respond_to(self, needle: impl Into<String>, response: MockResponse) -> Self {
        self.rules.write().push((needle.into(), response));
        self
    }

    /// Fail every call with a spawn-style error.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// All captured calls, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.captured_calls.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Number of calls whose command line contains `needle`.
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.captured_calls
            .read()
            .iter()
            .filter(|spec| spec.display().contains(needle))
            .count()
    }

    fn next_response(&self, display: &str) -> MockResponse {
        if let Some((_, response)) = self.rules.read().iter().find(|(needle, _)| display.contains(needle.as_str())) {
            return response.clone();
        }

        let responses = self.responses.read();
        if responses.is_empty() {
            return MockResponse::success("");
        }
        let index = self.response_index.fetch_add(1, Ordering::SeqCst);
        responses[index.min(responses.len() - 1)].clone()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, spec: &CommandSpec) -> RunnerResult<ExecutionResult> {
        self.captured_calls.write().push(spec.clone());

        if let Some(message) = self.simulate_failure.read().clone() {
            return Err(RunnerError::ExecutionFailed(message));
        }

        let command_line = spec.display();
        let response = self.next_response(&command_line);
        let now = Utc::now();
        Ok(ExecutionResult {
            command: command_line,
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            started_at: now,
            finished_at: now,
            duration_ms: response.duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequence_repeats_last() {
        let runner = MockRunner::new()
            .add_response(MockResponse::failure(1, "first"))
            .add_response(MockResponse::failure(2, "second"));

        let spec = CommandSpec::shell("build");
        assert_eq!(runner.run(&spec).await.unwrap().exit_code, 1);
        assert_eq!(runner.run(&spec).await.unwrap().exit_code, 2);
        assert_eq!(runner.run(&spec).await.unwrap().exit_code, 2);
        assert_eq!(runner.call_count(), 3);
    }

    #[tokio::test]
    async fn test_rules_take_precedence() {
        let runner = MockRunner::new()
            .respond_to("deploy", MockResponse::success("deployed"))
            .add_response(MockResponse::failure(1, "build broke"));

        let deploy = runner.run(&CommandSpec::shell("./deploy.sh")).await.unwrap();
        assert_eq!(deploy.stdout, "deployed");
        let build = runner.run(&CommandSpec::shell("make")).await.unwrap();
        assert_eq!(build.exit_code, 1);
        assert_eq!(runner.calls_matching("deploy"), 1);
    }

    #[tokio::test]
    async fn test_simulated_failure() {
        let runner = MockRunner::new().simulate_failure("no shell");
        assert!(runner.run(&CommandSpec::shell("x")).await.is_err());
        assert_eq!(runner.call_count(), 1);
    }
}
