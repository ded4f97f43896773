//! # mend_runner
//!
//! Process execution for mend.
//!
//! The build tool, the deploy step and every remediation are opaque
//! subprocesses. This crate runs them and reports exit codes and captured
//! output, and performs the single post-deploy health probe.
//!
//! # Features
//!
//! - **Process runner**: `sh -c` / `cmd /C` or direct program execution with
//!   captured stdout/stderr and optional live echo
//! - **Remediations**: named, idempotent fix capabilities looked up by name
//! - **Health probe**: one bounded HTTP request after a fixed delay
//! - **Mock runner**: scripted responses and captured calls for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use mend_runner::{CommandRunner, CommandSpec, ProcessRunner, ProcessRunnerOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = ProcessRunner::new(ProcessRunnerOptions::default());
//!     let result = runner.run(&CommandSpec::shell("npm run build")).await?;
//!     println!("Exit code: {}", result.exit_code);
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod error;
pub mod health;
pub mod mock;
pub mod process;
pub mod remediation;
pub mod runner;

pub use command::CommandSpec;
pub use error::{RunnerError, RunnerResult};
pub use health::{HealthProbe, HealthStatus, HttpHealthProbe, StaticHealthProbe};
pub use mock::{MockResponse, MockRunner};
pub use process::{LogStream, ProcessRunner, ProcessRunnerOptions};
pub use remediation::{shell_quote, CommandRemediation, Remediation, RemediationRegistry};
pub use runner::{CommandRunner, ExecutionResult};
