//! `run` - drive the whole pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use mend_core::{
    InProcessPhases, Orchestrator, Phases, PipelineContext, PipelineOutcome, RunOptions, SubprocessPhases,
};
use mend_runner::{CommandRunner, HttpHealthProbe, ProcessRunner, ProcessRunnerOptions};
use tracing::info;

use super::resolve_project_root;

#[derive(Args)]
pub struct RunArgs {
    /// Project to build and deploy
    #[arg(default_value = ".")]
    project_root: PathBuf,

    /// Skip the pre-build scan
    #[arg(long, env = "MEND_SKIP_PROPHET")]
    pub(crate) skip_prophet: bool,

    /// Maximum build attempts (overrides the config file)
    #[arg(long, env = "MEND_MAX_RETRIES")]
    pub(crate) max_retries: Option<u32>,

    /// Run Prophet and Surgeon inside this process instead of spawning one
    /// process per phase
    #[arg(long)]
    pub(crate) in_process: bool,
}

/// Exit 0 on success (health warnings allowed), 1 on any terminal failure.
pub async fn execute(args: RunArgs, quiet: bool) -> Result<u8> {
    let root = resolve_project_root(&args.project_root)?;
    let mut ctx = PipelineContext::load(&root).context("Failed to load pipeline config")?;
    if let Some(max_retries) = args.max_retries {
        ctx.config = ctx.config.with_max_retries(max_retries)?;
    }

    info!("Run {} in {}", ctx.run_id, root.display());

    let build_runner: Arc<dyn CommandRunner> =
        Arc::new(ProcessRunner::new(ProcessRunnerOptions::new().stream_output(!quiet)));
    let phase_runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new(ProcessRunnerOptions::new()));

    let phases: Arc<dyn Phases> = if args.in_process {
        Arc::new(InProcessPhases::new(phase_runner))
    } else {
        Arc::new(SubprocessPhases::current_exe(phase_runner).context("Failed to locate the mend executable")?)
    };

    let health_probe = match &ctx.config.health_url {
        Some(url) => Some(
            HttpHealthProbe::new(
                url,
                Duration::from_secs(ctx.config.health_delay_secs),
                Duration::from_secs(ctx.config.health_timeout_secs),
            )
            .context("Failed to build health probe")?,
        ),
        None => None,
    };

    let options = RunOptions {
        skip_prophet: args.skip_prophet,
    };
    let mut orchestrator = Orchestrator::new(ctx, options, phases, build_runner);
    if let Some(probe) = health_probe {
        orchestrator = orchestrator.with_health_probe(Arc::new(probe));
    }
    let record_path = orchestrator.context().run_record_path();

    let record = orchestrator.run().await.context("Pipeline could not run")?;

    println!();
    println!(
        "Run {}: {} build attempt(s) of {}",
        record.run_id, record.attempts, record.max_retries
    );
    let states: Vec<String> = record.states().iter().map(|s| s.to_string()).collect();
    println!("  {}", states.join(" → "));
    println!("  record: {}", record_path.display());

    match &record.outcome {
        PipelineOutcome::Succeeded { health_warning: None } => println!("✅ Pipeline succeeded"),
        PipelineOutcome::Succeeded {
            health_warning: Some(warning),
        } => println!("⚠️ Pipeline succeeded with warning: {}", warning),
        PipelineOutcome::Failed { failure } => eprintln!("❌ {}", failure),
    }

    Ok(record.exit_code())
}
