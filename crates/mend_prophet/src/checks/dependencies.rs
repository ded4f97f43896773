use async_trait::async_trait;
use tracing::{info, warn};

use crate::check::{Check, CheckResult, Issue, ScanContext, INSTALL_REMEDIATION};
use crate::error::ScanResult;

/// The installed dependency directory exists alongside the manifest.
///
/// A missing directory is provably fixable by the install remediation.
/// The issue only counts as fixed if the installer succeeds and the
/// directory exists afterwards.
pub struct DependencyDirectoryCheck;

#[async_trait]
impl Check for DependencyDirectoryCheck {
    fn name(&self) -> &str {
        "dependency-directory"
    }

    async fn run(&self, ctx: &ScanContext) -> ScanResult<CheckResult> {
        let config = &ctx.config;
        let dependency_dir = ctx.path(&config.dependency_dir);
        let result = CheckResult::new(self.name()).with_detail("dependency_dir", &config.dependency_dir);

        if !tokio::fs::try_exists(ctx.path(&config.manifest)).await? {
            return Ok(result.with_detail("skipped", "no manifest"));
        }
        if tokio::fs::try_exists(&dependency_dir).await? {
            return Ok(result);
        }

        let message = format!("{} is missing; dependencies are not installed", config.dependency_dir);
        let Some(installer) = ctx.remediations.get(INSTALL_REMEDIATION) else {
            return Ok(result
                .with_issue(Issue::critical(message))
                .with_detail("remediation", "none registered"));
        };

        info!("Installing dependencies via '{}'", installer.name());
        if let Err(e) = installer.apply(&ctx.project_root, &[]).await {
            warn!("Dependency install failed: {}", e);
            return Ok(result
                .with_issue(Issue::critical(message).auto_fixable())
                .with_detail("install_error", e.to_string()));
        }

        if tokio::fs::try_exists(&dependency_dir).await? {
            Ok(result.with_issue(Issue::critical(message).auto_fixable().resolved()))
        } else {
            warn!("Installer succeeded but {} still missing", config.dependency_dir);
            Ok(result
                .with_issue(Issue::critical(message).auto_fixable())
                .with_detail("install_error", "dependency directory absent after install"))
        }
    }
}
