//! Pipeline configuration.
//!
//! Read from `.mend/config.yaml` under the project root. Every field has a
//! default, so a missing file or a partial file is valid.

use std::collections::HashMap;
use std::path::Path;

use mend_prophet::ProphetConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Name of the per-project state directory.
pub const STATE_DIR_NAME: &str = ".mend";

/// Name of the config file inside the state directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Shell command that builds the project
    pub build_command: String,
    /// Shell command that deploys a successful build; no deploy if unset
    pub deploy_command: Option<String>,
    /// Shell command Prophet uses to install missing dependencies
    pub install_command: String,
    pub manifest: String,
    pub dependency_dir: String,
    pub lockfile: String,
    /// Maximum build attempts per run
    pub max_retries: u32,
    /// Health endpoint probed once after deploy
    pub health_url: Option<String>,
    pub health_delay_secs: u64,
    pub health_timeout_secs: u64,
    /// Remediation name -> shell command template (`{N}` = capture group N)
    pub remediations: HashMap<String, String>,
    /// Glob patterns skipped by source scans
    pub ignore: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let prophet = ProphetConfig::default();
        Self {
            build_command: "npm run build".to_string(),
            deploy_command: None,
            install_command: "npm install".to_string(),
            manifest: prophet.manifest,
            dependency_dir: prophet.dependency_dir,
            lockfile: prophet.lockfile,
            max_retries: 3,
            health_url: None,
            health_delay_secs: 5,
            health_timeout_secs: 10,
            remediations: HashMap::new(),
            ignore: prophet.ignore,
        }
    }
}

impl PipelineConfig {
    /// Load the config for a project, falling back to defaults when the
    /// file does not exist.
    pub fn load(project_root: &Path) -> CoreResult<Self> {
        let path = project_root.join(STATE_DIR_NAME).join(CONFIG_FILE_NAME);
        if !path.exists() {
            debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Self = serde_yaml::from_str(&content).map_err(|source| CoreError::Config {
            path: path.clone(),
            source,
        })?;
        config.validate()?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.max_retries == 0 {
            return Err(CoreError::InvalidConfig("max_retries must be at least 1".to_string()));
        }
        if self.build_command.trim().is_empty() {
            return Err(CoreError::InvalidConfig("build_command must not be empty".to_string()));
        }
        Ok(())
    }

    /// Override the retry bound.
    pub fn with_max_retries(mut self, max_retries: u32) -> CoreResult<Self> {
        self.max_retries = max_retries;
        self.validate()?;
        Ok(self)
    }

    /// The subset of settings Prophet checks against.
    pub fn prophet_config(&self) -> ProphetConfig {
        ProphetConfig {
            manifest: self.manifest.clone(),
            dependency_dir: self.dependency_dir.clone(),
            lockfile: self.lockfile.clone(),
            ignore: self.ignore.clone(),
            ..ProphetConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = tempdir().unwrap();
        let config = PipelineConfig::load(temp.path()).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_partial_yaml() {
        let temp = tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join(STATE_DIR_NAME)).unwrap();
        std::fs::write(
            temp.path().join(STATE_DIR_NAME).join(CONFIG_FILE_NAME),
            "build_command: cargo build\nmax_retries: 5\nremediations:\n  install-dependency: npm install {1}\n",
        )
        .unwrap();

        let config = PipelineConfig::load(temp.path()).unwrap();
        assert_eq!(config.build_command, "cargo build");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.install_command, "npm install");
        assert_eq!(config.remediations.get("install-dependency").map(String::as_str), Some("npm install {1}"));
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let temp = tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join(STATE_DIR_NAME)).unwrap();
        std::fs::write(temp.path().join(STATE_DIR_NAME).join(CONFIG_FILE_NAME), "max_retries: [").unwrap();
        assert!(matches!(PipelineConfig::load(temp.path()), Err(CoreError::Config { .. })));
    }

    #[test]
    fn test_zero_retries_rejected() {
        assert!(PipelineConfig::default().with_max_retries(0).is_err());
    }
}
