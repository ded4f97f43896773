//! `prophet-scan` - run the pre-build diagnostic scan.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use mend_core::{run_prophet, PipelineContext};
use mend_prophet::ProphetScanner;
use mend_runner::{ProcessRunner, ProcessRunnerOptions};

use tracing::debug;

use super::{absolute_path, print_json, resolve_project_root, OutputFormat};
use crate::ExitCodes;

#[derive(Args)]
pub struct ProphetScanArgs {
    /// Project to scan
    #[arg(default_value = ".")]
    project_root: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Exit 0 when clear or fully auto-fixed, 1 when blocked.
pub async fn execute(args: ProphetScanArgs) -> Result<u8> {
    // An unresolvable root is reported by the project-root check.
    let root = match resolve_project_root(&args.project_root) {
        Ok(root) => root,
        Err(e) => {
            debug!("{:#}", e);
            absolute_path(&args.project_root)?
        }
    };
    let ctx = PipelineContext::load(&root).context("Failed to load pipeline config")?;
    let runner = Arc::new(ProcessRunner::new(ProcessRunnerOptions::default()));

    let result = run_prophet(&ctx, &ProphetScanner::standard(), runner).await;

    match args.format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text => {
            println!("{}", result.report());
            println!();
            if result.blocked {
                println!("❌ Prophet BLOCKED the build:");
                for issue in result.blocking_issues() {
                    println!("  - {}", issue);
                }
            } else {
                println!("✅ Prophet clear");
            }
        }
    }

    Ok(if result.blocked {
        ExitCodes::FAILURE
    } else {
        ExitCodes::SUCCESS
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_project_root_blocks_instead_of_erroring() {
        let temp = tempdir().unwrap();
        let gone = temp.path().join("gone");
        let args = ProphetScanArgs {
            project_root: gone.clone(),
            format: OutputFormat::Json,
        };

        let code = execute(args).await.unwrap();
        assert_eq!(code, ExitCodes::FAILURE);
        assert!(!gone.exists());
    }

    #[tokio::test]
    async fn test_clean_project_is_clear() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("package.json"), "{}").unwrap();
        std::fs::write(temp.path().join("package-lock.json"), "{}").unwrap();
        std::fs::create_dir(temp.path().join("node_modules")).unwrap();
        let args = ProphetScanArgs {
            project_root: temp.path().to_path_buf(),
            format: OutputFormat::Text,
        };

        assert_eq!(execute(args).await.unwrap(), ExitCodes::SUCCESS);
    }
}
