use std::io::ErrorKind;

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tracing::info;

use crate::check::{Check, CheckResult, Issue, ScanContext};
use crate::error::ScanResult;

/// Seeds `.env` from `.env.example` when the former is missing.
///
/// The copy never overwrites an existing `.env`.
pub struct EnvFileCheck;

#[async_trait]
impl Check for EnvFileCheck {
    fn name(&self) -> &str {
        "env-file"
    }

    async fn run(&self, ctx: &ScanContext) -> ScanResult<CheckResult> {
        let example = ctx.path(&ctx.config.env_example);
        let target = ctx.path(&ctx.config.env_file);
        let result = CheckResult::new(self.name());

        if !tokio::fs::try_exists(&example).await? || tokio::fs::try_exists(&target).await? {
            return Ok(result);
        }

        let message = format!("{} missing (template {} present)", ctx.config.env_file, ctx.config.env_example);
        let mut source = tokio::fs::File::open(&example).await?;
        let mut dest = match OpenOptions::new().write(true).create_new(true).open(&target).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(result),
            Err(e) => {
                return Ok(result
                    .with_issue(Issue::warning(message).auto_fixable())
                    .with_detail("copy_error", e.to_string()))
            }
        };
        tokio::io::copy(&mut source, &mut dest).await?;
        dest.sync_all().await?;

        info!("Created {} from {}", ctx.config.env_file, ctx.config.env_example);
        Ok(result.with_issue(Issue::warning(message).auto_fixable().resolved()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::ProphetConfig;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_copies_example_once() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join(".env.example"), "PORT=3000\n").unwrap();
        let ctx = ScanContext::new(temp.path(), ProphetConfig::default());

        let first = EnvFileCheck.run(&ctx).await.unwrap();
        assert_eq!(first.fixed, 1);
        assert_eq!(std::fs::read_to_string(temp.path().join(".env")).unwrap(), "PORT=3000\n");

        let second = EnvFileCheck.run(&ctx).await.unwrap();
        assert!(second.issues.is_empty());
    }

    #[tokio::test]
    async fn test_existing_env_is_untouched() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join(".env.example"), "PORT=3000\n").unwrap();
        std::fs::write(temp.path().join(".env"), "PORT=8080\n").unwrap();
        let ctx = ScanContext::new(temp.path(), ProphetConfig::default());

        let result = EnvFileCheck.run(&ctx).await.unwrap();
        assert!(result.issues.is_empty());
        assert_eq!(std::fs::read_to_string(temp.path().join(".env")).unwrap(), "PORT=8080\n");
    }
}
