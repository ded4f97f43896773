use async_trait::async_trait;

use crate::check::{Check, CheckResult, Issue, ScanContext};
use crate::error::ScanResult;

/// A lockfile accompanies the manifest.
///
/// Generating one changes resolved versions, so a missing lockfile is only
/// reported.
pub struct LockfileCheck;

#[async_trait]
impl Check for LockfileCheck {
    fn name(&self) -> &str {
        "lockfile"
    }

    async fn run(&self, ctx: &ScanContext) -> ScanResult<CheckResult> {
        let result = CheckResult::new(self.name());
        if !tokio::fs::try_exists(ctx.path(&ctx.config.manifest)).await? {
            return Ok(result.with_detail("skipped", "no manifest"));
        }

        if tokio::fs::try_exists(ctx.path(&ctx.config.lockfile)).await? {
            Ok(result.with_detail("lockfile", &ctx.config.lockfile))
        } else {
            Ok(result.with_issue(Issue::warning(format!(
                "{} is missing; dependency versions are not pinned",
                ctx.config.lockfile
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
    async fn test_missing_lockfile_is_unfixed_warning() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("package.json"), "{}").unwrap();
        let ctx = ScanContext::new(temp.path(), ProphetConfig::default());

        let result = LockfileCheck.run(&ctx).await.unwrap();
        assert_eq!(result.unfixed, 1);
        assert!(!result.has_blocking_issue());
        assert!(!temp.path().join("package-lock.json").exists());
    }
}
