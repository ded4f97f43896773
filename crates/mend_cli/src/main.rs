//! mend CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success (clear scan, fix recorded, pipeline succeeded)
//! - 1: Terminal failure (blocked, escalation, retries exhausted, deploy failed)
//! - 2: Invalid arguments
//! - 3: Runtime error (unreadable config, unwritable state directory)

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const FAILURE: u8 = 1;
    pub const RUNTIME_ERROR: u8 = 3;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let mut filter = EnvFilter::from_default_env().add_directive(tracing_subscriber::filter::LevelFilter::WARN.into());
    if let Ok(directive) = format!("mend={}", level).parse() {
        filter = filter.add_directive(directive);
    }
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match cli.command {
        Commands::ProphetScan(args) => commands::prophet_scan::execute(args).await,
        Commands::SurgeonAnalyze(args) => commands::surgeon_analyze::execute(args).await,
        Commands::Run(args) => commands::run::execute(args, cli.quiet).await,
        Commands::Memory(args) => commands::memory::execute(args),
        Commands::Catalog(args) => commands::catalog::execute(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(ExitCodes::RUNTIME_ERROR)
        }
    }
}
