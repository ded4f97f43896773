//! Pluggable fix capabilities.
//!
//! A remediation is a named action that applies a fix. Remediations must be
//! idempotent and safe to re-run; the pipeline may apply the same one on
//! every retry.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use mend_patterns::render_template;
use tracing::{debug, info};

use crate::command::CommandSpec;
use crate::error::{RunnerError, RunnerResult};
use crate::runner::CommandRunner;

/// A named, idempotent fix capability.
#[async_trait]
pub trait Remediation: Send + Sync {
    fn name(&self) -> &str;

    /// Apply the remediation inside `project_root`.
    ///
    /// `groups` are the capture groups of the error match that selected it.
    async fn apply(&self, project_root: &Path, groups: &[String]) -> RunnerResult<()>;
}

/// Quote a value for safe interpolation into a shell command line.
pub fn shell_quote(value: &str) -> String {
    if cfg!(windows) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// Remediation backed by a shell command template.
///
/// `{N}` in the template is replaced with capture group `N`, shell-quoted.
pub struct CommandRemediation {
    name: String,
    template: String,
    runner: Arc<dyn CommandRunner>,
}

impl CommandRemediation {
    pub fn new(name: impl Into<String>, template: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            runner,
        }
    }

    /// Render the command line for the given capture groups.
    pub fn command_line(&self, groups: &[String]) -> String {
        let quoted: Vec<String> = groups.iter().map(|g| shell_quote(g)).collect();
        render_template(&self.template, &quoted)
    }
}

#[async_trait]
impl Remediation for CommandRemediation {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, project_root: &Path, groups: &[String]) -> RunnerResult<()> {
        let line = self.command_line(groups);
        info!("Applying remediation '{}': {}", self.name, line);

        let result = self
            .runner
            .run(&CommandSpec::shell(line).current_dir(project_root))
            .await?;

        if !result.success() {
            let output: String = result.combined_output().chars().take(500).collect();
            return Err(RunnerError::RemediationFailed {
                name: self.name.clone(),
                exit_code: result.exit_code,
                output,
            });
        }

        debug!("Remediation '{}' completed in {}ms", self.name, result.duration_ms);
        Ok(())
    }
}

/// Maps remediation names to implementations.
#[derive(Default, Clone)]
pub struct RemediationRegistry {
    remediations: HashMap<String, Arc<dyn Remediation>>,
}

impl RemediationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry of command remediations from `name -> template`.
    pub fn from_templates(templates: &HashMap<String, String>, runner: Arc<dyn CommandRunner>) -> Self {
        let mut registry = Self::new();
        for (name, template) in templates {
            registry.register(Arc::new(CommandRemediation::new(name, template, runner.clone())));
        }
        registry
    }

    /// Register a remediation under its `name()`, replacing any previous one.
    pub fn register(&mut self, remediation: Arc<dyn Remediation>) {
        let name = remediation.name().to_string();
        debug!("Registering remediation: {}", name);
        self.remediations.insert(name, remediation);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Remediation>> {
        self.remediations.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.remediations.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.remediations.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.remediations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remediations.is_empty()
    }
}

impl std::fmt::Debug for RemediationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemediationRegistry")
            .field("remediations", &self.names())
            .finish()
    }
}
