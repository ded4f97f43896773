//! Per-run pipeline context.

use std::path::{Path, PathBuf};

use mend_memory::{AuditLog, FileRepository, RepairMemory, AUDIT_LOG_FILE_NAME, MEMORY_FILE_NAME};
use uuid::Uuid;

use crate::config::{PipelineConfig, STATE_DIR_NAME};
use crate::error::CoreResult;

const BUILD_OUTPUT_FILE_NAME: &str = "build-output.log";
const RUNS_DIR_NAME: &str = "runs";

/// Explicit state passed to every phase entrypoint.
///
/// Phases share nothing in memory; everything that must survive between
/// them lives under `state_dir`.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub run_id: Uuid,
    pub project_root: PathBuf,
    pub state_dir: PathBuf,
    pub config: PipelineConfig,
}

impl PipelineContext {
    pub fn new(project_root: impl Into<PathBuf>, config: PipelineConfig) -> Self {
        let project_root = project_root.into();
        Self {
            run_id: Uuid::new_v4(),
            state_dir: project_root.join(STATE_DIR_NAME),
            project_root,
            config,
        }
    }

    /// Context with the project's config file loaded.
    pub fn load(project_root: impl Into<PathBuf>) -> CoreResult<Self> {
        let project_root = project_root.into();
        let config = PipelineConfig::load(&project_root)?;
        Ok(Self::new(project_root, config))
    }

    pub fn memory_path(&self) -> PathBuf {
        self.state_dir.join(MEMORY_FILE_NAME)
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.state_dir.join(AUDIT_LOG_FILE_NAME)
    }

    /// Where the combined output of the latest build attempt is captured.
    pub fn build_output_path(&self) -> PathBuf {
        self.state_dir.join(BUILD_OUTPUT_FILE_NAME)
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.state_dir.join(RUNS_DIR_NAME)
    }

    pub fn run_record_path(&self) -> PathBuf {
        self.runs_dir().join(format!("{}.json", self.run_id))
    }

    pub fn ensure_state_dir(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.state_dir)?;
        Ok(())
    }

    /// Open Repair Memory fresh from disk.
    pub fn open_memory(&self) -> CoreResult<RepairMemory<FileRepository>> {
        Ok(RepairMemory::open(FileRepository::for_state_dir(&self.state_dir))?)
    }

    pub fn audit(&self) -> AuditLog {
        AuditLog::for_state_dir(&self.state_dir)
    }

    /// Path displayed to operators, relative to the project root when possible.
    pub fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.project_root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_paths() {
        let ctx = PipelineContext::new("/srv/app", PipelineConfig::default());
        assert_eq!(ctx.state_dir, PathBuf::from("/srv/app/.mend"));
        assert_eq!(ctx.build_output_path(), PathBuf::from("/srv/app/.mend/build-output.log"));
        assert!(ctx.run_record_path().starts_with("/srv/app/.mend/runs"));
        assert_eq!(ctx.display_path(&ctx.build_output_path()), ".mend/build-output.log");
    }
}
