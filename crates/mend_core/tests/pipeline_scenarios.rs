//! End-to-end pipeline scenarios against a temporary project.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use mend_core::{
    CoreError, CoreResult, InProcessPhases, Orchestrator, Phases, PipelineConfig, PipelineContext, PipelineOutcome,
    PipelineState, RunOptions, SurgeonResult, TerminalFailure,
};
use mend_patterns::ErrorCategory;
use mend_prophet::{ProphetResult, ProphetScanner};
use mend_runner::{HealthStatus, MockResponse, MockRunner, StaticHealthProbe};
use tempfile::{tempdir, TempDir};

const MISSING_LEFT_PAD: &str = "> app@1.0.0 build\n> webpack\n\nError: Cannot find module 'left-pad'\nRequire stack:\n- /home/ci/app/src/index.js\n";

/// A project that passes the standard Prophet checks.
fn healthy_project() -> TempDir {
    let temp = tempdir().unwrap();
    std::fs::write(temp.path().join("package.json"), r#"{"name":"app"}"#).unwrap();
    std::fs::write(temp.path().join("package-lock.json"), "{}").unwrap();
    std::fs::create_dir_all(temp.path().join("node_modules")).unwrap();
    temp
}

fn context(root: &Path, max_retries: u32) -> PipelineContext {
    let config = PipelineConfig::default().with_max_retries(max_retries).unwrap();
    PipelineContext::new(root, config)
}

/// Phases wrapper counting how often each phase is entered.
struct CountingPhases {
    inner: InProcessPhases,
    prophet_calls: AtomicUsize,
    surgeon_calls: AtomicUsize,
}

impl CountingPhases {
    fn new(runner: &MockRunner) -> Arc<Self> {
        Arc::new(Self {
            inner: InProcessPhases::new(Arc::new(runner.clone())),
            prophet_calls: AtomicUsize::new(0),
            surgeon_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Phases for CountingPhases {
    async fn prophet_scan(&self, ctx: &PipelineContext) -> CoreResult<ProphetResult> {
        self.prophet_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.prophet_scan(ctx).await
    }

    async fn surgeon_analyze(&self, ctx: &PipelineContext, build_output: &Path) -> CoreResult<SurgeonResult> {
        self.surgeon_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.surgeon_analyze(ctx, build_output).await
    }
}

fn orchestrator(ctx: PipelineContext, options: RunOptions, runner: &MockRunner, phases: Arc<dyn Phases>) -> Orchestrator {
    Orchestrator::new(ctx, options, phases, Arc::new(runner.clone()))
}

#[tokio::test]
async fn test_scenario_a_missing_module_is_remembered_once() {
    let project = healthy_project();
    let ctx = context(project.path(), 3);
    ctx.ensure_state_dir().unwrap();
    std::fs::write(ctx.build_output_path(), MISSING_LEFT_PAD).unwrap();
    let phases = InProcessPhases::new(Arc::new(MockRunner::new()));

    let first = phases.surgeon_analyze(&ctx, &ctx.build_output_path()).await.unwrap();
    assert!(first.fix_applied);
    let diagnosis = &first.diagnoses[0];
    assert_eq!(diagnosis.category, ErrorCategory::MissingDependency);
    assert!(diagnosis.description.as_deref().unwrap().contains("left-pad"));

    let memory = ctx.open_memory().unwrap();
    assert_eq!(memory.len(), 1);
    assert_eq!(memory.lookup(&diagnosis.memory_key).unwrap().use_count, 1);

    // Same failure in a later run, with a different absolute path in the stack
    let later = MISSING_LEFT_PAD.replace("/home/ci/app", "/var/lib/build/42/app");
    std::fs::write(ctx.build_output_path(), later).unwrap();
    let second = phases.surgeon_analyze(&ctx, &ctx.build_output_path()).await.unwrap();
    assert!(second.fix_applied);
    assert!(second.diagnoses[0].known);

    let memory = ctx.open_memory().unwrap();
    assert_eq!(memory.len(), 1);
    assert_eq!(memory.lookup(&diagnosis.memory_key).unwrap().use_count, 2);
}

#[tokio::test]
async fn test_scenario_b_retry_bound_is_exact() {
    let project = healthy_project();
    let runner = MockRunner::new().respond_to("npm run build", MockResponse::failure(1, MISSING_LEFT_PAD));
    let phases = CountingPhases::new(&runner);

    let record = orchestrator(context(project.path(), 3), RunOptions::default(), &runner, phases.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(runner.calls_matching("npm run build"), 3);
    assert_eq!(record.attempts, 3);
    assert_eq!(phases.surgeon_calls.load(Ordering::SeqCst), 3);
    assert_eq!(record.final_state(), Some(PipelineState::RetryExhausted));
    assert_eq!(record.exit_code(), 1);
    assert!(matches!(
        record.outcome,
        PipelineOutcome::Failed {
            failure: TerminalFailure::RetryExhausted { attempts: 3, max_retries: 3, .. }
        }
    ));
    assert!(record.outcome.escalation().unwrap().contains("RETRY_EXHAUSTED"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_scenario_c_prophet_installs_missing_dependency_directory() {
    use mend_core::run_prophet;
    use mend_runner::{ProcessRunner, ProcessRunnerOptions};

    let project = healthy_project();
    std::fs::remove_dir_all(project.path().join("node_modules")).unwrap();
    let config = PipelineConfig {
        install_command: "mkdir node_modules".to_string(),
        ..PipelineConfig::default()
    };
    let ctx = PipelineContext::new(project.path(), config);
    let runner = Arc::new(ProcessRunner::new(ProcessRunnerOptions::default()));

    let result = run_prophet(&ctx, &ProphetScanner::standard(), runner).await;

    assert_eq!(result.total_issues, 1);
    assert_eq!(result.auto_fixed, 1);
    assert!(!result.blocked);
    assert!(project.path().join("node_modules").is_dir());
}

#[tokio::test]
async fn test_scenario_d_skip_prophet_goes_straight_to_build() {
    let project = tempdir().unwrap();
    let runner = MockRunner::new();
    let phases = CountingPhases::new(&runner);
    let options = RunOptions { skip_prophet: true };

    let record = orchestrator(context(project.path(), 3), options, &runner, phases.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(phases.prophet_calls.load(Ordering::SeqCst), 0);
    let states = record.states();
    assert_eq!(&states[..2], &[PipelineState::Init, PipelineState::BuildAttempt]);
    assert!(!states.contains(&PipelineState::ProphetScan));
    assert_eq!(record.exit_code(), 0);
}

#[tokio::test]
async fn test_unrecognized_failure_escalates_after_one_attempt() {
    let project = healthy_project();
    let runner = MockRunner::new().respond_to(
        "npm run build",
        MockResponse::failure(2, "Segmentation fault (core dumped)\n"),
    );

    let record = orchestrator(
        context(project.path(), 3),
        RunOptions::default(),
        &runner,
        CountingPhases::new(&runner),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(record.attempts, 1);
    assert_eq!(record.final_state(), Some(PipelineState::NoFix));
    assert_eq!(record.exit_code(), 1);
    assert!(record.outcome.escalation().unwrap().starts_with("NO_FIX"));
    assert!(ctx_memory_is_empty(project.path()));
}

fn ctx_memory_is_empty(root: &Path) -> bool {
    context(root, 3).open_memory().unwrap().is_empty()
}

#[tokio::test]
async fn test_blocked_project_never_builds() {
    let project = tempdir().unwrap();
    let runner = MockRunner::new();

    let record = orchestrator(
        context(project.path(), 3),
        RunOptions::default(),
        &runner,
        CountingPhases::new(&runner),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(record.final_state(), Some(PipelineState::Blocked));
    assert_eq!(runner.calls_matching("npm run build"), 0);
    assert_eq!(record.exit_code(), 1);
    assert!(record.outcome.escalation().unwrap().contains("package.json"));
}

#[tokio::test]
async fn test_recovers_when_retry_succeeds() {
    let project = healthy_project();
    let runner = MockRunner::new()
        .add_response(MockResponse::failure(1, MISSING_LEFT_PAD))
        .add_response(MockResponse::success("built in 2.1s"));
    let phases = CountingPhases::new(&runner);

    let record = orchestrator(
        context(project.path(), 3),
        RunOptions { skip_prophet: true },
        &runner,
        phases,
    )
    .run()
    .await
    .unwrap();

    assert_eq!(record.attempts, 2);
    assert_eq!(
        record.states(),
        vec![
            PipelineState::Init,
            PipelineState::BuildAttempt,
            PipelineState::SurgeonAnalyze,
            PipelineState::BuildAttempt,
            PipelineState::Deploy,
            PipelineState::GuardianCheck,
            PipelineState::Done,
        ]
    );
    assert!(record.outcome.is_success());
}

#[tokio::test]
async fn test_deploy_failure_is_terminal() {
    let project = healthy_project();
    let runner = MockRunner::new().respond_to("deploy.sh", MockResponse::failure(3, "permission denied"));
    let mut ctx = context(project.path(), 3);
    ctx.config.deploy_command = Some("./deploy.sh".to_string());

    let record = orchestrator(ctx, RunOptions { skip_prophet: true }, &runner, CountingPhases::new(&runner))
        .run()
        .await
        .unwrap();

    assert_eq!(record.final_state(), Some(PipelineState::DeployFailed));
    assert_eq!(record.exit_code(), 1);
}

#[tokio::test]
async fn test_unhealthy_deploy_still_succeeds_with_warning() {
    let project = healthy_project();
    let runner = MockRunner::new();
    let probe = StaticHealthProbe::new(HealthStatus::Unhealthy { code: 503 });

    let record = orchestrator(
        context(project.path(), 3),
        RunOptions { skip_prophet: true },
        &runner,
        CountingPhases::new(&runner),
    )
    .with_health_probe(Arc::new(probe.clone()))
    .run()
    .await
    .unwrap();

    assert_eq!(probe.call_count(), 1);
    assert_eq!(record.exit_code(), 0);
    match &record.outcome {
        PipelineOutcome::Succeeded { health_warning } => {
            assert!(health_warning.as_deref().unwrap().contains("503"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_run_is_recorded_and_audited() {
    let project = healthy_project();
    let runner = MockRunner::new();
    let ctx = context(project.path(), 3);
    let record_path = ctx.run_record_path();
    let audit = ctx.audit();

    let record = orchestrator(ctx, RunOptions::default(), &runner, CountingPhases::new(&runner))
        .run()
        .await
        .unwrap();

    let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(record_path).unwrap()).unwrap();
    assert_eq!(saved["run_id"], record.run_id.to_string());
    assert_eq!(saved["outcome"]["status"], "succeeded");

    let lines = audit.read_lines().unwrap();
    assert!(lines.iter().any(|l| l.contains("[prophet]")));
    assert!(lines.iter().any(|l| l.contains("INIT -> PROPHET_SCAN")));
    assert!(lines.iter().any(|l| l.contains("GUARDIAN_CHECK -> DONE")));
}

/// Phases whose Prophet or Surgeon entrypoint errors out.
struct BrokenPhases {
    inner: InProcessPhases,
    prophet_fails: bool,
    surgeon_fails: bool,
}

impl BrokenPhases {
    fn new(runner: &MockRunner, prophet_fails: bool, surgeon_fails: bool) -> Arc<Self> {
        Arc::new(Self {
            inner: InProcessPhases::new(Arc::new(runner.clone())),
            prophet_fails,
            surgeon_fails,
        })
    }
}

#[async_trait]
impl Phases for BrokenPhases {
    async fn prophet_scan(&self, ctx: &PipelineContext) -> CoreResult<ProphetResult> {
        if self.prophet_fails {
            return Err(CoreError::Phase {
                phase: "prophet-scan".to_string(),
                message: "exited with 3".to_string(),
            });
        }
        self.inner.prophet_scan(ctx).await
    }

    async fn surgeon_analyze(&self, ctx: &PipelineContext, build_output: &Path) -> CoreResult<SurgeonResult> {
        if self.surgeon_fails {
            return Err(CoreError::Phase {
                phase: "surgeon-analyze".to_string(),
                message: "exited with 3".to_string(),
            });
        }
        self.inner.surgeon_analyze(ctx, build_output).await
    }
}

#[tokio::test]
async fn test_prophet_error_still_builds() {
    let project = healthy_project();
    let runner = MockRunner::new();

    let record = orchestrator(
        context(project.path(), 3),
        RunOptions::default(),
        &runner,
        BrokenPhases::new(&runner, true, false),
    )
    .run()
    .await
    .unwrap();

    let states = record.states();
    assert_eq!(
        &states[..3],
        &[PipelineState::Init, PipelineState::ProphetScan, PipelineState::BuildAttempt]
    );
    assert_eq!(runner.calls_matching("npm run build"), 1);
    assert_eq!(record.final_state(), Some(PipelineState::Done));
    assert_eq!(record.exit_code(), 0);
}

#[tokio::test]
async fn test_surgeon_error_ends_in_no_fix() {
    let project = healthy_project();
    let runner = MockRunner::new().respond_to("npm run build", MockResponse::failure(1, MISSING_LEFT_PAD));

    let record = orchestrator(
        context(project.path(), 3),
        RunOptions::default(),
        &runner,
        BrokenPhases::new(&runner, false, true),
    )
    .run()
    .await
    .unwrap();

    let states = record.states();
    assert!(states.contains(&PipelineState::SurgeonAnalyze));
    assert_eq!(record.final_state(), Some(PipelineState::NoFix));
    assert_eq!(record.attempts, 1);
    assert_eq!(record.exit_code(), 1);
    assert!(record.outcome.escalation().unwrap().contains("surgeon failed"));
}

#[tokio::test]
async fn test_uncapturable_build_output_is_not_analyzed() {
    let project = healthy_project();
    let ctx = context(project.path(), 3);
    // A directory where the output file belongs makes the capture fail.
    std::fs::create_dir_all(ctx.build_output_path()).unwrap();
    let runner = MockRunner::new().respond_to("npm run build", MockResponse::failure(1, MISSING_LEFT_PAD));
    let phases = CountingPhases::new(&runner);

    let record = orchestrator(ctx, RunOptions::default(), &runner, phases.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(phases.surgeon_calls.load(Ordering::SeqCst), 0);
    assert!(!record.states().contains(&PipelineState::SurgeonAnalyze));
    assert_eq!(record.final_state(), Some(PipelineState::NoFix));
    assert_eq!(record.exit_code(), 1);
    assert!(record
        .outcome
        .escalation()
        .unwrap()
        .contains("could not capture build output"));
}

#[tokio::test]
async fn test_retry_replaces_previous_build_output() {
    let project = healthy_project();
    let runner = MockRunner::new()
        .add_response(MockResponse::failure(1, MISSING_LEFT_PAD))
        .add_response(MockResponse::failure(1, "Segmentation fault (core dumped)\n"));
    let ctx = context(project.path(), 3);
    let output_path = ctx.build_output_path();

    let record = orchestrator(ctx, RunOptions::default(), &runner, CountingPhases::new(&runner))
        .run()
        .await
        .unwrap();

    assert_eq!(record.attempts, 2);
    assert_eq!(record.final_state(), Some(PipelineState::NoFix));
    let captured = std::fs::read_to_string(output_path).unwrap();
    assert!(captured.contains("Segmentation fault"));
    assert!(!captured.contains("left-pad"));
}
