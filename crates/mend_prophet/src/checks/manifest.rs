use async_trait::async_trait;

use crate::check::{Check, CheckResult, Issue, ScanContext};
use crate::error::ScanResult;

/// The dependency manifest is present. Nothing can be built without it.
pub struct ManifestCheck;

#[async_trait]
impl Check for ManifestCheck {
    fn name(&self) -> &str {
        "manifest"
    }

    async fn run(&self, ctx: &ScanContext) -> ScanResult<CheckResult> {
        let manifest = ctx.path(&ctx.config.manifest);
        let result = CheckResult::new(self.name()).with_detail("manifest", &ctx.config.manifest);

        if tokio::fs::try_exists(&manifest).await? {
            Ok(result)
        } else {
            Ok(result.with_issue(Issue::critical(format!(
                "Manifest {} not found in project root",
                ctx.config.manifest
            ))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::ProphetConfig;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_manifest_presence() {
        let temp = tempdir().unwrap();
        let ctx = ScanContext::new(temp.path(), ProphetConfig::default());

        let missing = ManifestCheck.run(&ctx).await.unwrap();
        assert!(missing.has_blocking_issue());

        std::fs::write(temp.path().join("package.json"), "{}").unwrap();
        let present = ManifestCheck.run(&ctx).await.unwrap();
        assert!(present.issues.is_empty());
    }
}
