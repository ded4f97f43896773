//! CLI command definitions.
//!
//! Each pipeline phase is an independently invocable subcommand, so that
//! `mend run` can execute every phase in its own process.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

pub mod catalog;
pub mod memory;
pub mod prophet_scan;
pub mod run;
pub mod surgeon_analyze;

/// mend - self-healing build/deploy pipeline
#[derive(Parser)]
#[command(name = "mend")]
#[command(version, about = "mend - self-healing build/deploy pipeline")]
#[command(long_about = r#"
mend wraps a project's build with a pre-build scan (Prophet), failure
analysis with learned fixes (Surgeon), a bounded retry loop, deploy and a
one-shot post-deploy health probe.

COMMANDS:
  prophet-scan     → Run pre-build checks and safe auto-fixes
  surgeon-analyze  → Classify a failed build's output and record a fix
  run              → Drive the whole pipeline
  memory           → Inspect or prune Repair Memory
  catalog          → List the known error patterns

EXIT CODES:
  0 - Success
  1 - Terminal failure (escalation required)
  2 - Invalid arguments
  3 - Runtime error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the pre-build diagnostic scan
    #[command(name = "prophet-scan")]
    ProphetScan(prophet_scan::ProphetScanArgs),

    /// Analyze captured build output and record a fix
    #[command(name = "surgeon-analyze")]
    SurgeonAnalyze(surgeon_analyze::SurgeonAnalyzeArgs),

    /// Run the full pipeline
    Run(run::RunArgs),

    /// Inspect or prune Repair Memory
    Memory(memory::MemoryArgs),

    /// List the built-in error pattern catalog
    Catalog(catalog::CatalogArgs),
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Resolve a project root argument to an existing absolute directory.
/// Absolute form of `path`, without requiring it to exist.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    Ok(if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    })
}

pub fn resolve_project_root(path: &Path) -> Result<PathBuf> {
    let absolute = absolute_path(path)?;
    absolute
        .canonicalize()
        .with_context(|| format!("Project root not found: {}", absolute.display()))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::tempdir;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::parse_from(["mend", "run", "/srv/app", "--skip-prophet", "--max-retries", "5"]);
        match cli.command {
            Commands::Run(args) => {
                assert!(args.skip_prophet);
                assert_eq!(args.max_retries, Some(5));
                assert!(!args.in_process);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_resolve_project_root() {
        let temp = tempdir().unwrap();
        assert!(resolve_project_root(temp.path()).unwrap().is_absolute());
        assert!(resolve_project_root(&temp.path().join("missing")).is_err());
        assert_eq!(absolute_path(&temp.path().join("missing")).unwrap(), temp.path().join("missing"));
    }
}
