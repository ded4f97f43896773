//! `memory` - inspect or prune Repair Memory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use mend_core::PipelineContext;
use tracing::info;

use super::{print_json, resolve_project_root, OutputFormat};
use crate::ExitCodes;

#[derive(Args)]
pub struct MemoryArgs {
    #[command(subcommand)]
    command: MemoryCommand,
}

#[derive(Subcommand)]
enum MemoryCommand {
    /// List remembered fixes, most recently used first
    List {
        #[arg(default_value = ".")]
        project_root: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Remove a remembered fix by key
    Forget {
        key: String,

        #[arg(default_value = ".")]
        project_root: PathBuf,
    },
}

pub fn execute(args: MemoryArgs) -> Result<u8> {
    match args.command {
        MemoryCommand::List { project_root, format } => list(project_root, format),
        MemoryCommand::Forget { key, project_root } => forget(project_root, &key),
    }
}

fn open(project_root: PathBuf) -> Result<PipelineContext> {
    let root = resolve_project_root(&project_root)?;
    PipelineContext::load(root).context("Failed to load pipeline config")
}

fn list(project_root: PathBuf, format: OutputFormat) -> Result<u8> {
    let ctx = open(project_root)?;
    let memory = ctx.open_memory().context("Failed to open repair memory")?;
    let entries = memory.entries();

    if format == OutputFormat::Json {
        print_json(&entries)?;
        return Ok(ExitCodes::SUCCESS);
    }

    if entries.is_empty() {
        println!("Repair memory is empty ({})", ctx.memory_path().display());
        return Ok(ExitCodes::SUCCESS);
    }

    println!("{} remembered fix(es):", entries.len());
    for entry in entries {
        println!();
        println!("  {} [{}] {}", entry.key, entry.category, entry.fix_name);
        println!("    {}", entry.description);
        println!("    signature: {}", entry.signature);
        println!(
            "    used {} time(s), first {}, last {}",
            entry.use_count,
            entry.first_seen_at.to_rfc3339(),
            entry.last_used_at.to_rfc3339()
        );
    }
    Ok(ExitCodes::SUCCESS)
}

fn forget(project_root: PathBuf, key: &str) -> Result<u8> {
    let ctx = open(project_root)?;
    let mut memory = ctx.open_memory().context("Failed to open repair memory")?;

    match memory.forget(key).context("Failed to update repair memory")? {
        Some(entry) => {
            info!("Forgot {} ({})", entry.key, entry.fix_name);
            ctx.audit().record("memory", format!("forgot {} ({})", entry.key, entry.fix_name));
            println!("✅ Forgot {}", key);
            Ok(ExitCodes::SUCCESS)
        }
        None => {
            println!("No entry with key {}", key);
            Ok(ExitCodes::FAILURE)
        }
    }
}
