//! Local subprocess runner.

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::command::CommandSpec;
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{CommandRunner, ExecutionResult};

/// Output stream of a subprocess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// Process runner options.
#[derive(Debug, Clone)]
pub struct ProcessRunnerOptions {
    /// Print commands without executing them
    pub dry_run: bool,
    /// Echo output lines while the process runs
    pub stream_output: bool,
    /// CI mode (prefix echoed lines with timestamp and stream)
    pub ci_mode: bool,
}

impl Default for ProcessRunnerOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            stream_output: false,
            ci_mode: std::env::var("CI").is_ok(),
        }
    }
}

impl ProcessRunnerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn stream_output(mut self, enabled: bool) -> Self {
        self.stream_output = enabled;
        self
    }
}

/// Runs commands as local child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    options: ProcessRunnerOptions,
}

impl ProcessRunner {
    pub fn new(options: ProcessRunnerOptions) -> Self {
        Self { options }
    }

    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    fn build_command(spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }
        cmd.envs(&spec.env);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }
}

/// Read a stream to the end, decoding lossily and optionally echoing lines.
async fn collect_output<R>(reader: R, stream: LogStream, echo: bool, ci_mode: bool) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut output = String::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        if echo {
            let text = line.trim_end_matches(['\r', '\n']);
            if ci_mode {
                println!("[{}] [{}] {}", Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"), stream, text);
            } else {
                match stream {
                    LogStream::Stdout => println!("{}", text),
                    LogStream::Stderr => eprintln!("{}", text),
                }
            }
        }
        output.push_str(&line);
    }

    Ok(output)
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> RunnerResult<ExecutionResult> {
        let command_line = spec.display();
        let started_at = Utc::now();
        let start = Instant::now();

        if self.options.dry_run {
            info!("[dry-run] {}", command_line);
            return Ok(ExecutionResult {
                command: command_line.clone(),
                exit_code: 0,
                stdout: format!("[dry-run] {}\n", command_line),
                stderr: String::new(),
                started_at,
                finished_at: Utc::now(),
                duration_ms: 0,
            });
        }

        debug!("Executing: {}", command_line);
        let mut child = Self::build_command(spec)
            .spawn()
            .map_err(|source| RunnerError::SpawnFailed {
                command: command_line.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stderr was not captured".to_string()))?;

        let echo = self.options.stream_output;
        let ci_mode = self.options.ci_mode;
        let (stdout, stderr, status) = tokio::try_join!(
            collect_output(stdout, LogStream::Stdout, echo, ci_mode),
            collect_output(stderr, LogStream::Stderr, echo, ci_mode),
            child.wait(),
        )?;

        let exit_code = status.code().unwrap_or(-1);
        let duration_ms = start.elapsed().as_millis() as u64;
        debug!("'{}' exited with {} after {}ms", command_line, exit_code, duration_ms);

        Ok(ExecutionResult {
            command: command_line,
            exit_code,
            stdout,
            stderr,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
        })
    }
}
