use async_trait::async_trait;

use crate::check::{Check, CheckResult, Issue, ScanContext};
use crate::error::ScanResult;

/// The project root exists and is a directory.
pub struct ProjectRootCheck;

#[async_trait]
impl Check for ProjectRootCheck {
    fn name(&self) -> &str {
        "project-root"
    }

    async fn run(&self, ctx: &ScanContext) -> ScanResult<CheckResult> {
        let root = &ctx.project_root;
        let result = CheckResult::new(self.name()).with_detail("path", root.display().to_string());

        Ok(match tokio::fs::metadata(root).await {
            Ok(meta) if meta.is_dir() => result,
            Ok(_) => result.with_issue(Issue::critical(format!("{} is not a directory", root.display()))),
            Err(e) => result.with_issue(Issue::critical(format!(
                "Project root {} is not accessible: {}",
                root.display(),
                e
            ))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::ProphetConfig;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_root_is_critical() {
        let temp = tempdir().unwrap();
        let ctx = ScanContext::new(temp.path().join("gone"), ProphetConfig::default());
        let result = ProjectRootCheck.run(&ctx).await.unwrap();
        assert!(result.has_blocking_issue());
    }

    #[tokio::test]
    async fn test_existing_root_is_clear() {
        let temp = tempdir().unwrap();
        let ctx = ScanContext::new(temp.path(), ProphetConfig::default());
        let result = ProjectRootCheck.run(&ctx).await.unwrap();
        assert!(result.issues.is_empty());
    }
}
