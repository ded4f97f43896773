//! Pipeline state machine.
//!
//! ```text
//! INIT -> PROPHET_SCAN -> BLOCKED | BUILD_ATTEMPT
//! BUILD_ATTEMPT -> DEPLOY | SURGEON_ANALYZE
//! SURGEON_ANALYZE -> BUILD_ATTEMPT | RETRY_EXHAUSTED | NO_FIX
//! DEPLOY -> GUARDIAN_CHECK | DEPLOY_FAILED
//! GUARDIAN_CHECK -> DONE
//! ```
//!
//! The retry bound counts build attempts per run, not per distinct error.
//! No individual build attempt is timed out.

use std::sync::Arc;

use chrono::Utc;
use mend_memory::AuditLog;
use mend_runner::{CommandRunner, CommandSpec, ExecutionResult, HealthProbe, HealthStatus};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::context::PipelineContext;
use crate::error::{CoreResult, TerminalFailure};
use crate::phases::Phases;
use crate::record::{PipelineOutcome, RunRecord, Transition};

/// Orchestrator states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Init,
    ProphetScan,
    Blocked,
    BuildAttempt,
    SurgeonAnalyze,
    RetryExhausted,
    NoFix,
    Deploy,
    DeployFailed,
    GuardianCheck,
    Done,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::ProphetScan => "PROPHET_SCAN",
            Self::Blocked => "BLOCKED",
            Self::BuildAttempt => "BUILD_ATTEMPT",
            Self::SurgeonAnalyze => "SURGEON_ANALYZE",
            Self::RetryExhausted => "RETRY_EXHAUSTED",
            Self::NoFix => "NO_FIX",
            Self::Deploy => "DEPLOY",
            Self::DeployFailed => "DEPLOY_FAILED",
            Self::GuardianCheck => "GUARDIAN_CHECK",
            Self::Done => "DONE",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Blocked | Self::RetryExhausted | Self::NoFix | Self::DeployFailed | Self::Done
        )
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-run switches, usually from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Go straight from INIT to BUILD_ATTEMPT
    pub skip_prophet: bool,
}

/// Mutable bookkeeping of one run.
struct RunState {
    attempts: u32,
    transitions: Vec<Transition>,
    failure: Option<TerminalFailure>,
    health: Option<HealthStatus>,
}

/// Drives one pipeline run.
pub struct Orchestrator {
    ctx: PipelineContext,
    options: RunOptions,
    phases: Arc<dyn Phases>,
    runner: Arc<dyn CommandRunner>,
    health_probe: Option<Arc<dyn HealthProbe>>,
    audit: AuditLog,
}

impl Orchestrator {
    pub fn new(
        ctx: PipelineContext,
        options: RunOptions,
        phases: Arc<dyn Phases>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let audit = ctx.audit();
        Self {
            ctx,
            options,
            phases,
            runner,
            health_probe: None,
            audit,
        }
    }

    /// Probe issued once after a successful deploy. Without one, the
    /// health check is skipped.
    pub fn with_health_probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.health_probe = Some(probe);
        self
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Run the pipeline to a terminal state.
    ///
    /// Errors are returned only when the state directory cannot be
    /// prepared; every pipeline failure is reported through the record's
    /// outcome.
    pub async fn run(&self) -> CoreResult<RunRecord> {
        self.ctx.ensure_state_dir()?;
        let started_at = Utc::now();
        let max_retries = self.ctx.config.max_retries;

        info!(
            "Pipeline run {} for {} (max_retries={}, skip_prophet={})",
            self.ctx.run_id,
            self.ctx.project_root.display(),
            max_retries,
            self.options.skip_prophet
        );
        self.audit.record(
            "orchestrator",
            format!("run {} started (max_retries={})", self.ctx.run_id, max_retries),
        );

        let mut run = RunState {
            attempts: 0,
            transitions: Vec::new(),
            failure: None,
            health: None,
        };
        let mut state = PipelineState::Init;

        while !state.is_terminal() {
            let (next, note) = self.step(state, &mut run).await;
            self.transition(&mut run, state, next, note);
            state = next;
        }

        let outcome = match run.failure.take() {
            Some(failure) => {
                error!("{}", failure);
                self.audit.record("orchestrator", format!("escalation: {}", failure));
                PipelineOutcome::Failed { failure }
            }
            None => {
                let health_warning = run
                    .health
                    .as_ref()
                    .filter(|h| !h.is_healthy() && **h != HealthStatus::Skipped)
                    .map(|h| format!("post-deploy health check {}", h));
                if let Some(warning) = &health_warning {
                    warn!("{}", warning);
                }
                PipelineOutcome::Succeeded { health_warning }
            }
        };

        let record = RunRecord {
            run_id: self.ctx.run_id,
            project_root: self.ctx.project_root.clone(),
            started_at,
            completed_at: Utc::now(),
            attempts: run.attempts,
            max_retries,
            skip_prophet: self.options.skip_prophet,
            transitions: run.transitions,
            outcome,
            health: run.health,
        };

        if let Err(e) = record.save(&self.ctx.run_record_path()) {
            warn!("Failed to save run record: {}", e);
        }
        self.audit.record(
            "orchestrator",
            format!(
                "run {} finished after {} attempt(s) with exit code {}",
                self.ctx.run_id,
                record.attempts,
                record.exit_code()
            ),
        );
        Ok(record)
    }

    async fn step(&self, state: PipelineState, run: &mut RunState) -> (PipelineState, Option<String>) {
        match state {
            PipelineState::Init if self.options.skip_prophet => {
                (PipelineState::BuildAttempt, Some("prophet skipped".to_string()))
            }
            PipelineState::Init => (PipelineState::ProphetScan, None),
            PipelineState::ProphetScan => self.prophet_scan(run).await,
            PipelineState::BuildAttempt => self.build_attempt(run).await,
            PipelineState::SurgeonAnalyze => self.surgeon_analyze(run).await,
            PipelineState::Deploy => self.deploy(run).await,
            PipelineState::GuardianCheck => self.guardian_check(run).await,
            terminal => (terminal, None),
        }
    }

    async fn prophet_scan(&self, run: &mut RunState) -> (PipelineState, Option<String>) {
        match self.phases.prophet_scan(&self.ctx).await {
            Ok(result) if result.blocked => {
                let issues = result.blocking_issues();
                run.failure = Some(TerminalFailure::Blocked { issues });
                (PipelineState::Blocked, Some(format!("{} issue(s)", result.total_issues)))
            }
            Ok(result) => (
                PipelineState::BuildAttempt,
                Some(format!(
                    "{} issue(s), {} auto-fixed",
                    result.total_issues, result.auto_fixed
                )),
            ),
            Err(e) => {
                warn!("Prophet failed, continuing without pre-build scan: {}", e);
                (PipelineState::BuildAttempt, Some(format!("prophet degraded: {}", e)))
            }
        }
    }

    async fn build_attempt(&self, run: &mut RunState) -> (PipelineState, Option<String>) {
        run.attempts += 1;
        info!(
            "Build attempt {}/{}: {}",
            run.attempts, self.ctx.config.max_retries, self.ctx.config.build_command
        );

        let spec = CommandSpec::shell(&self.ctx.config.build_command).current_dir(&self.ctx.project_root);
        let (success, output, note) = match self.runner.run(&spec).await {
            Ok(result) => (
                result.success(),
                result.combined_output(),
                format!("attempt {} exit {} ({}ms)", run.attempts, result.exit_code, result.duration_ms),
            ),
            Err(e) => (false, e.to_string(), format!("attempt {} could not start: {}", run.attempts, e)),
        };

        let captured = self.capture_build_output(&output).await;

        match (success, captured) {
            (true, Ok(())) => (PipelineState::Deploy, Some(note)),
            (true, Err(e)) => {
                warn!("Failed to capture build output: {}", e);
                (PipelineState::Deploy, Some(format!("{}; output not captured: {}", note, e)))
            }
            (false, Ok(())) => (PipelineState::SurgeonAnalyze, Some(note)),
            (false, Err(e)) => {
                error!("Failed to capture build output, nothing to analyze: {}", e);
                let output_path = self.ctx.build_output_path();
                run.failure = Some(TerminalFailure::UnrecognizedFailure {
                    attempt: run.attempts,
                    detail: format!("could not capture build output: {}", e),
                    output_log: self.ctx.display_path(&output_path),
                });
                (PipelineState::NoFix, Some(note))
            }
        }
    }

    /// Replace the captured output of the previous attempt.
    ///
    /// The old file is removed first so a failed write never leaves stale
    /// output behind for the Surgeon.
    async fn capture_build_output(&self, output: &str) -> std::io::Result<()> {
        let path = self.ctx.build_output_path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        tokio::fs::write(&path, output.as_bytes()).await
    }

    async fn surgeon_analyze(&self, run: &mut RunState) -> (PipelineState, Option<String>) {
        let output_path = self.ctx.build_output_path();
        let output_log = self.ctx.display_path(&output_path);
        let max_retries = self.ctx.config.max_retries;

        let result = match self.phases.surgeon_analyze(&self.ctx, &output_path).await {
            Ok(result) => result,
            Err(e) => {
                error!("Surgeon failed: {}", e);
                run.failure = Some(TerminalFailure::UnrecognizedFailure {
                    attempt: run.attempts,
                    detail: format!("surgeon failed: {}", e),
                    output_log,
                });
                return (PipelineState::NoFix, None);
            }
        };

        let summary = result.summary();
        if !result.fix_applied {
            run.failure = Some(TerminalFailure::UnrecognizedFailure {
                attempt: run.attempts,
                detail: summary.clone(),
                output_log,
            });
            (PipelineState::NoFix, Some(summary))
        } else if run.attempts >= max_retries {
            run.failure = Some(TerminalFailure::RetryExhausted {
                attempts: run.attempts,
                max_retries,
                output_log,
            });
            (PipelineState::RetryExhausted, Some(summary))
        } else {
            (PipelineState::BuildAttempt, Some(summary))
        }
    }

    async fn deploy(&self, run: &mut RunState) -> (PipelineState, Option<String>) {
        let Some(command) = &self.ctx.config.deploy_command else {
            return (PipelineState::GuardianCheck, Some("no deploy command configured".to_string()));
        };

        info!("Deploying: {}", command);
        let spec = CommandSpec::shell(command).current_dir(&self.ctx.project_root);
        match self.runner.run(&spec).await {
            Ok(result) if result.success() => (
                PipelineState::GuardianCheck,
                Some(format!("deploy exit 0 ({}ms)", result.duration_ms)),
            ),
            Ok(result) => {
                run.failure = Some(TerminalFailure::DeployFailed {
                    exit_code: result.exit_code,
                    detail: tail(&result),
                });
                (PipelineState::DeployFailed, Some(format!("deploy exit {}", result.exit_code)))
            }
            Err(e) => {
                run.failure = Some(TerminalFailure::DeployFailed {
                    exit_code: -1,
                    detail: e.to_string(),
                });
                (PipelineState::DeployFailed, Some("deploy could not start".to_string()))
            }
        }
    }

    async fn guardian_check(&self, run: &mut RunState) -> (PipelineState, Option<String>) {
        let status = match &self.health_probe {
            Some(probe) => probe.probe().await,
            None => HealthStatus::Skipped,
        };
        let note = status.summary();
        run.health = Some(status);
        (PipelineState::Done, Some(note))
    }

    fn transition(&self, run: &mut RunState, from: PipelineState, to: PipelineState, note: Option<String>) {
        info!("{} -> {}", from, to);
        let message = match &note {
            Some(note) => format!("{} -> {} ({})", from, to, note),
            None => format!("{} -> {}", from, to),
        };
        self.audit.record("orchestrator", message);
        run.transitions.push(Transition {
            from,
            to,
            at: Utc::now(),
            note,
        });
    }
}

fn tail(result: &ExecutionResult) -> String {
    let output = result.combined_output();
    let trimmed = output.trim();
    let start = trimmed
        .char_indices()
        .rev()
        .nth(499)
        .map(|(i, _)| i)
        .unwrap_or(0);
    trimmed[start..].to_string()
}
