//! Prophet scan engine.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::check::{Check, CheckResult, ScanContext};
use crate::checks;

/// Aggregate result of a Prophet scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProphetResult {
    pub checks: Vec<CheckResult>,
    /// Sum of issues across all checks
    pub total_issues: usize,
    /// Sum of `fixed` across all checks
    pub auto_fixed: usize,
    /// True iff some check carries an unresolved critical issue
    pub blocked: bool,
    /// Wall-clock duration of the whole scan
    pub duration_ms: u64,
    /// Scanner-level degradations
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ProphetResult {
    fn from_checks(checks: Vec<CheckResult>, warnings: Vec<String>, duration_ms: u64) -> Self {
        let total_issues = checks.iter().map(|c| c.issues.len()).sum();
        let auto_fixed = checks.iter().map(|c| c.fixed).sum();
        let blocked = checks.iter().any(CheckResult::has_blocking_issue);
        Self {
            checks,
            total_issues,
            auto_fixed,
            blocked,
            duration_ms,
            warnings,
        }
    }

    pub fn unfixed(&self) -> usize {
        self.checks.iter().map(|c| c.unfixed).sum()
    }

    /// Messages of every unresolved critical issue, prefixed by check name.
    pub fn blocking_issues(&self) -> Vec<String> {
        self.checks
            .iter()
            .flat_map(|c| {
                c.issues
                    .iter()
                    .filter(|i| i.is_blocking())
                    .map(move |i| format!("{}: {}", c.name, i.message))
            })
            .collect()
    }

    /// Generate a human-readable report.
    pub fn report(&self) -> String {
        let mut report = String::new();

        report.push_str(&format!(
            "Prophet scan: {}\n",
            if self.blocked { "❌ BLOCKED" } else { "✅ CLEAR" }
        ));
        report.push_str(&format!("Duration: {}ms\n\n", self.duration_ms));

        report.push_str("Checks:\n");
        for check in &self.checks {
            let status = if check.has_blocking_issue() {
                "❌"
            } else if check.unfixed > 0 {
                "⚠️"
            } else {
                "✅"
            };
            report.push_str(&format!(
                "  {} {} ({} fixed, {} unfixed, {}ms)\n",
                status, check.name, check.fixed, check.unfixed, check.duration_ms
            ));
            for issue in &check.issues {
                let marker = if issue.resolved { "fixed" } else { "open" };
                report.push_str(&format!("     [{}] {} ({})\n", issue.severity, issue.message, marker));
            }
            for detail in &check.details {
                report.push_str(&format!("     {} = {}\n", detail.key, detail.value));
            }
        }

        if !self.warnings.is_empty() {
            report.push_str("\nWarnings:\n");
            for warning in &self.warnings {
                report.push_str(&format!("  ⚠️ {}\n", warning));
            }
        }

        report.push_str(&format!(
            "\nSummary: {} issues, {} auto-fixed, {} unfixed",
            self.total_issues,
            self.auto_fixed,
            self.unfixed()
        ));

        report
    }
}

/// Runs a set of checks concurrently, each in its own task.
#[derive(Clone)]
pub struct ProphetScanner {
    checks: Vec<Arc<dyn Check>>,
}

impl ProphetScanner {
    pub fn new(checks: Vec<Arc<dyn Check>>) -> Self {
        Self { checks }
    }

    /// Scanner with the standard check set.
    pub fn standard() -> Self {
        Self::new(checks::standard())
    }

    pub fn check_names(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Run every check. Never fails.
    pub async fn run(&self, ctx: ScanContext) -> ProphetResult {
        info!("Prophet scanning {}", ctx.project_root.display());
        let start = Instant::now();
        let ctx = Arc::new(ctx);

        let handles: Vec<_> = self
            .checks
            .iter()
            .map(|check| {
                let check = Arc::clone(check);
                let ctx = Arc::clone(&ctx);
                let name = check.name().to_string();
                let handle = tokio::spawn(async move {
                    let started = Instant::now();
                    let outcome = check.run(&ctx).await;
                    (outcome, started.elapsed().as_millis() as u64)
                });
                (name, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        let mut warnings = Vec::new();

        for (name, handle) in handles {
            let result = match handle.await {
                Ok((Ok(mut result), elapsed)) => {
                    result.name = name;
                    result.duration_ms = elapsed;
                    result
                }
                Ok((Err(e), elapsed)) => {
                    warn!("Check '{}' failed: {}", name, e);
                    let mut result = CheckResult::errored(&name, e.to_string());
                    result.duration_ms = elapsed;
                    result
                }
                Err(join_error) => {
                    let reason = if join_error.is_panic() {
                        "check panicked".to_string()
                    } else {
                        join_error.to_string()
                    };
                    error!("Check '{}' aborted: {}", name, reason);
                    warnings.push(format!("check '{}' aborted: {}", name, reason));
                    CheckResult::errored(&name, reason)
                }
            };
            debug!(
                "Check '{}': {} issues ({} fixed) in {}ms",
                result.name,
                result.issues.len(),
                result.fixed,
                result.duration_ms
            );
            results.push(result);
        }

        let prophet = ProphetResult::from_checks(results, warnings, start.elapsed().as_millis() as u64);
        info!(
            "Prophet complete: {} issues, {} auto-fixed, blocked={}",
            prophet.total_issues, prophet.auto_fixed, prophet.blocked
        );
        prophet
    }
}

impl Default for ProphetScanner {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{Issue, ProphetConfig};
    use crate::error::{ScanError, ScanResult};
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct FixedCheck(&'static str, Vec<Issue>);

    #[async_trait]
    impl Check for FixedCheck {
        fn name(&self) -> &str {
            self.0
        }

        async fn run(&self, _ctx: &ScanContext) -> ScanResult<CheckResult> {
            let mut result = CheckResult::new(self.0);
            for issue in &self.1 {
                result.push(issue.clone());
            }
            Ok(result)
        }
    }

    struct FailingCheck;

    #[async_trait]
    impl Check for FailingCheck {
        fn name(&self) -> &str {
            "failing"
        }

        async fn run(&self, _ctx: &ScanContext) -> ScanResult<CheckResult> {
            Err(ScanError::Failed("disk on fire".to_string()))
        }
    }

    struct PanickingCheck;

    #[async_trait]
    impl Check for PanickingCheck {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn run(&self, _ctx: &ScanContext) -> ScanResult<CheckResult> {
            panic!("unexpected state");
        }
    }

    fn ctx() -> (tempfile::TempDir, ScanContext) {
        let temp = tempdir().unwrap();
        let ctx = ScanContext::new(temp.path(), ProphetConfig::default());
        (temp, ctx)
    }

    #[tokio::test]
    async fn test_totals_are_sums() {
        let (_temp, ctx) = ctx();
        let scanner = ProphetScanner::new(vec![
            Arc::new(FixedCheck("a", vec![Issue::warning("w1"), Issue::critical("c").resolved()])),
            Arc::new(FixedCheck("b", vec![Issue::info("i")])),
        ]);

        let result = scanner.run(ctx).await;
        assert_eq!(result.total_issues, 3);
        assert_eq!(result.auto_fixed, 1);
        assert!(!result.blocked);
    }

    #[tokio::test]
    async fn test_unfixed_critical_blocks() {
        let (_temp, ctx) = ctx();
        let scanner = ProphetScanner::new(vec![Arc::new(FixedCheck("a", vec![Issue::critical("nope")]))]);

        let result = scanner.run(ctx).await;
        assert!(result.blocked);
        assert_eq!(result.blocking_issues(), vec!["a: nope".to_string()]);
    }

    #[tokio::test]
    async fn test_failing_and_panicking_checks_are_isolated() {
        let (_temp, ctx) = ctx();
        let scanner = ProphetScanner::new(vec![
            Arc::new(FailingCheck),
            Arc::new(PanickingCheck),
            Arc::new(FixedCheck("ok", vec![])),
        ]);

        let result = scanner.run(ctx).await;
        assert_eq!(result.checks.len(), 3);
        assert_eq!(result.checks[0].error.as_deref(), Some("Check failed: disk on fire"));
        assert_eq!(result.checks[1].error.as_deref(), Some("check panicked"));
        assert!(result.checks[2].is_clear());
        assert_eq!(result.total_issues, 2);
        assert!(!result.blocked);
        assert_eq!(result.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_report_mentions_blocking_check() {
        let (_temp, ctx) = ctx();
        let scanner = ProphetScanner::new(vec![Arc::new(FixedCheck("manifest", vec![Issue::critical("missing")]))]);
        let report = scanner.run(ctx).await.report();
        assert!(report.contains("BLOCKED"));
        assert!(report.contains("[critical] missing (open)"));
    }
}
