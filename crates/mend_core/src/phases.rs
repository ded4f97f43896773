//! Phase entrypoints.
//!
//! Prophet and Surgeon are independently invocable: each takes the explicit
//! [`PipelineContext`] and reads or writes only what lives under the state
//! directory. [`Phases`] abstracts how the orchestrator reaches them, either
//! by calling the entrypoints directly or by re-invoking the `mend` binary
//! so that every phase runs in its own process.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use mend_prophet::{ProphetResult, ProphetScanner, ScanContext, INSTALL_REMEDIATION};
use mend_runner::{CommandRemediation, CommandRunner, CommandSpec, ExecutionResult, RemediationRegistry};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::context::PipelineContext;
use crate::error::{CoreError, CoreResult};
use crate::surgeon::{Surgeon, SurgeonResult};

/// Remediations available to a phase: the configured templates plus the
/// dependency installer.
pub fn remediation_registry(ctx: &PipelineContext, runner: Arc<dyn CommandRunner>) -> RemediationRegistry {
    let mut registry = RemediationRegistry::from_templates(&ctx.config.remediations, runner.clone());
    if !registry.contains(INSTALL_REMEDIATION) && !ctx.config.install_command.trim().is_empty() {
        registry.register(Arc::new(CommandRemediation::new(
            INSTALL_REMEDIATION,
            ctx.config.install_command.clone(),
            runner,
        )));
    }
    registry
}

/// Prophet entrypoint. Never fails.
pub async fn run_prophet(ctx: &PipelineContext, scanner: &ProphetScanner, runner: Arc<dyn CommandRunner>) -> ProphetResult {
    let scan = ScanContext::new(&ctx.project_root, ctx.config.prophet_config())
        .with_remediations(remediation_registry(ctx, runner));
    let result = scanner.run(scan).await;

    // No audit trail for a root that does not exist; writing one would create it.
    if !ctx.project_root.is_dir() {
        debug!("Skipping audit for missing project root {:?}", ctx.project_root);
        return result;
    }

    ctx.audit().record(
        "prophet",
        format!(
            "{} issue(s), {} auto-fixed, blocked={} ({}ms)",
            result.total_issues, result.auto_fixed, result.blocked, result.duration_ms
        ),
    );
    for issue in result.blocking_issues() {
        ctx.audit().record("prophet", format!("critical: {}", issue));
    }
    result
}

/// Surgeon entrypoint: analyze a captured build output file against a
/// freshly opened Repair Memory.
pub async fn run_surgeon(
    ctx: &PipelineContext,
    runner: Arc<dyn CommandRunner>,
    build_output: &Path,
) -> CoreResult<SurgeonResult> {
    let bytes = tokio::fs::read(build_output).await?;
    let text = String::from_utf8_lossy(&bytes);
    debug!("Surgeon analyzing {} bytes from {:?}", bytes.len(), build_output);

    let memory = ctx.open_memory()?;
    let mut surgeon = Surgeon::new(memory, remediation_registry(ctx, runner), &ctx.project_root);
    let result = surgeon.analyze(&text).await?;

    let audit = ctx.audit();
    for diagnosis in &result.diagnoses {
        audit.record(
            "surgeon",
            format!(
                "{} [{}] key={} fix={} known={} remediated={}",
                diagnosis.pattern_key,
                diagnosis.category,
                diagnosis.memory_key,
                diagnosis.fix_name.as_deref().unwrap_or("none"),
                diagnosis.known,
                diagnosis.remediated
            ),
        );
    }
    audit.record("surgeon", result.summary());
    Ok(result)
}

/// How the orchestrator invokes the Prophet and Surgeon phases.
#[async_trait]
pub trait Phases: Send + Sync {
    async fn prophet_scan(&self, ctx: &PipelineContext) -> CoreResult<ProphetResult>;

    async fn surgeon_analyze(&self, ctx: &PipelineContext, build_output: &Path) -> CoreResult<SurgeonResult>;
}

/// Runs phases by calling their entrypoints in this process.
pub struct InProcessPhases {
    scanner: ProphetScanner,
    runner: Arc<dyn CommandRunner>,
}

impl InProcessPhases {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            scanner: ProphetScanner::standard(),
            runner,
        }
    }

    pub fn with_scanner(mut self, scanner: ProphetScanner) -> Self {
        self.scanner = scanner;
        self
    }
}

#[async_trait]
impl Phases for InProcessPhases {
    async fn prophet_scan(&self, ctx: &PipelineContext) -> CoreResult<ProphetResult> {
        Ok(run_prophet(ctx, &self.scanner, self.runner.clone()).await)
    }

    async fn surgeon_analyze(&self, ctx: &PipelineContext, build_output: &Path) -> CoreResult<SurgeonResult> {
        run_surgeon(ctx, self.runner.clone(), build_output).await
    }
}

/// Runs each phase as a separate `mend` process.
///
/// The child prints its result as JSON on stdout; its exit code must be 0
/// or 1, anything else is a phase failure.
pub struct SubprocessPhases {
    executable: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl SubprocessPhases {
    pub fn new(executable: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            executable: executable.into(),
            runner,
        }
    }

    /// Re-invoke the currently running executable.
    pub fn current_exe(runner: Arc<dyn CommandRunner>) -> CoreResult<Self> {
        Ok(Self::new(std::env::current_exe()?, runner))
    }

    fn command(&self, ctx: &PipelineContext, subcommand: &str) -> CommandSpec {
        CommandSpec::new(self.executable.to_string_lossy())
            .arg("--quiet")
            .arg(subcommand)
            .arg(ctx.project_root.to_string_lossy())
            .current_dir(&ctx.project_root)
    }

    async fn invoke<T: DeserializeOwned>(&self, phase: &str, spec: CommandSpec) -> CoreResult<T> {
        info!("Spawning phase process: {}", spec.display());
        let result = self.runner.run(&spec).await?;
        parse_phase_output(phase, &result)
    }
}

fn parse_phase_output<T: DeserializeOwned>(phase: &str, result: &ExecutionResult) -> CoreResult<T> {
    if result.exit_code != 0 && result.exit_code != 1 {
        let stderr: String = result.stderr.chars().take(500).collect();
        return Err(CoreError::Phase {
            phase: phase.to_string(),
            message: format!("exited with code {}: {}", result.exit_code, stderr.trim()),
        });
    }
    serde_json::from_str(result.stdout.trim()).map_err(|e| CoreError::Phase {
        phase: phase.to_string(),
        message: format!("unreadable result: {}", e),
    })
}

#[async_trait]
impl Phases for SubprocessPhases {
    async fn prophet_scan(&self, ctx: &PipelineContext) -> CoreResult<ProphetResult> {
        let spec = self.command(ctx, "prophet-scan").arg("--format").arg("json");
        self.invoke("prophet-scan", spec).await
    }

    async fn surgeon_analyze(&self, ctx: &PipelineContext, build_output: &Path) -> CoreResult<SurgeonResult> {
        let spec = self
            .command(ctx, "surgeon-analyze")
            .arg(build_output.to_string_lossy())
            .arg("--format")
            .arg("json");
        self.invoke("surgeon-analyze", spec).await
    }
}
