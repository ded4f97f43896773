//! # mend_core
//!
//! The mend pipeline: Prophet, build, Surgeon, retry, deploy, health probe.
//!
//! # Overview
//!
//! - [`PipelineConfig`] / [`PipelineContext`]: explicit per-run state handed
//!   to every phase entrypoint
//! - [`Surgeon`]: classifies failed build output, reuses or derives fixes,
//!   and updates Repair Memory
//! - [`Phases`]: how Prophet and Surgeon are invoked, in-process or as
//!   separate processes
//! - [`Orchestrator`]: the bounded-retry state machine producing a
//!   [`RunRecord`]
//!
//! Every terminal failure carries a [`TerminalFailure`] whose message is the
//! escalation shown to the operator, and maps to a non-zero exit code.

pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod phases;
pub mod record;
pub mod surgeon;

pub use config::{PipelineConfig, CONFIG_FILE_NAME, STATE_DIR_NAME};
pub use context::PipelineContext;
pub use error::{CoreError, CoreResult, TerminalFailure};
pub use orchestrator::{Orchestrator, PipelineState, RunOptions};
pub use phases::{run_prophet, run_surgeon, InProcessPhases, Phases, SubprocessPhases};
pub use record::{PipelineOutcome, RunRecord, Transition};
pub use surgeon::{Diagnosis, Surgeon, SurgeonResult};
