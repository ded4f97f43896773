//! Check contract and result types.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mend_runner::RemediationRegistry;
use serde::{Deserialize, Serialize};

use crate::error::ScanResult;

/// Name of the remediation that installs project dependencies.
pub const INSTALL_REMEDIATION: &str = "install-dependencies";

/// Issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A problem found by a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
    /// Whether a safe automatic fix exists for this issue
    pub auto_fixable: bool,
    /// Whether the fix was applied and verified
    #[serde(default)]
    pub resolved: bool,
}

impl Issue {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            auto_fixable: false,
            resolved: false,
        }
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Self::new(Severity::Critical, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn auto_fixable(mut self) -> Self {
        self.auto_fixable = true;
        self
    }

    pub fn resolved(mut self) -> Self {
        self.resolved = true;
        self
    }

    /// Critical and still present after any fix attempt.
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Critical && !self.resolved
    }
}

/// Free-form diagnostic fact reported by a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detail {
    pub key: String,
    pub value: String,
}

/// Result of running a single check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub issues: Vec<Issue>,
    /// Issues resolved by an auto-fix
    pub fixed: usize,
    /// Issues still present
    pub unfixed: usize,
    #[serde(default)]
    pub details: Vec<Detail>,
    /// Set when the check itself failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl CheckResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            issues: Vec::new(),
            fixed: 0,
            unfixed: 0,
            details: Vec::new(),
            error: None,
            duration_ms: 0,
        }
    }

    /// Result for a check that errored or panicked.
    ///
    /// The failure counts as one unfixed warning so that it shows up in the
    /// totals without blocking the pipeline.
    pub fn errored(name: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        let mut result = Self::new(name);
        result.push(Issue::warning(format!("Check did not complete: {}", error)));
        result.error = Some(error);
        result
    }

    /// Add an issue, updating the fixed/unfixed counters.
    pub fn push(&mut self, issue: Issue) {
        if issue.resolved {
            self.fixed += 1;
        } else {
            self.unfixed += 1;
        }
        self.issues.push(issue);
    }

    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.push(issue);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push(Detail {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn is_clear(&self) -> bool {
        self.issues.is_empty() && self.error.is_none()
    }

    pub fn has_blocking_issue(&self) -> bool {
        self.issues.iter().any(Issue::is_blocking)
    }
}

/// Project layout Prophet checks against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProphetConfig {
    /// Dependency manifest (e.g. `package.json`)
    pub manifest: String,
    /// Installed dependency directory (e.g. `node_modules`)
    pub dependency_dir: String,
    /// Lockfile (e.g. `package-lock.json`)
    pub lockfile: String,
    pub env_example: String,
    pub env_file: String,
    /// Glob patterns skipped when scanning source files
    pub ignore: Vec<String>,
    /// Files larger than this are not scanned for conflict markers
    pub max_scan_bytes: u64,
}

impl Default for ProphetConfig {
    fn default() -> Self {
        Self {
            manifest: "package.json".to_string(),
            dependency_dir: "node_modules".to_string(),
            lockfile: "package-lock.json".to_string(),
            env_example: ".env.example".to_string(),
            env_file: ".env".to_string(),
            ignore: default_ignore(),
            max_scan_bytes: 1024 * 1024,
        }
    }
}

pub(crate) fn default_ignore() -> Vec<String> {
    ["node_modules", ".git", ".mend", "target", "dist", "build", "coverage"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Everything a check may look at or act on.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub project_root: PathBuf,
    pub config: ProphetConfig,
    /// Remediations checks may apply as auto-fixes
    pub remediations: RemediationRegistry,
}

impl ScanContext {
    pub fn new(project_root: impl Into<PathBuf>, config: ProphetConfig) -> Self {
        Self {
            project_root: project_root.into(),
            config,
            remediations: RemediationRegistry::new(),
        }
    }

    pub fn with_remediations(mut self, remediations: RemediationRegistry) -> Self {
        self.remediations = remediations;
        self
    }

    /// Resolve a path relative to the project root.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.project_root.join(relative)
    }
}

/// An independent, fault-isolated diagnostic.
///
/// Any fix a check applies must be idempotent and must not depend on the
/// order in which checks run.
#[async_trait]
pub trait Check: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, ctx: &ScanContext) -> ScanResult<CheckResult>;
}
