//! `surgeon-analyze` - classify a failed build's output.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use mend_core::{run_surgeon, PipelineContext, SurgeonResult};
use mend_runner::{ProcessRunner, ProcessRunnerOptions};

use super::{print_json, resolve_project_root, OutputFormat};
use crate::ExitCodes;

#[derive(Args)]
pub struct SurgeonAnalyzeArgs {
    /// Project the build belongs to
    project_root: PathBuf,

    /// File holding the captured build output
    build_output_file: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Exit 0 when a fix was recorded (retry the build), 1 to escalate.
pub async fn execute(args: SurgeonAnalyzeArgs) -> Result<u8> {
    let root = resolve_project_root(&args.project_root)?;
    let ctx = PipelineContext::load(&root).context("Failed to load pipeline config")?;
    let runner = Arc::new(ProcessRunner::new(ProcessRunnerOptions::default()));

    let result = run_surgeon(&ctx, runner, &args.build_output_file)
        .await
        .with_context(|| format!("Failed to analyze {}", args.build_output_file.display()))?;

    match args.format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text => print_text(&result),
    }

    Ok(exit_code(&result))
}

fn exit_code(result: &SurgeonResult) -> u8 {
    if result.fix_applied {
        ExitCodes::SUCCESS
    } else {
        ExitCodes::FAILURE
    }
}

fn print_text(result: &SurgeonResult) {
    if result.diagnoses.is_empty() {
        println!("❌ No recognized error pattern in build output; escalate to an operator.");
        return;
    }

    for diagnosis in &result.diagnoses {
        let marker = if diagnosis.known { "🧠" } else { "🔍" };
        println!("{} [{}] {}", marker, diagnosis.category, diagnosis.line);
        match (&diagnosis.fix_name, &diagnosis.description) {
            (Some(fix), Some(description)) => {
                println!("   fix: {} - {}", fix, description);
                if diagnosis.remediated {
                    println!("   remediation applied");
                }
            }
            _ => println!("   no automatic fix"),
        }
    }

    println!();
    if result.fix_applied {
        println!("✅ Fix recorded; retry the build.");
    } else {
        println!("❌ No applicable fix; escalate to an operator.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_follows_fix_applied() {
        let mut result = SurgeonResult::default();
        assert_eq!(exit_code(&result), ExitCodes::FAILURE);
        result.fix_applied = true;
        assert_eq!(exit_code(&result), ExitCodes::SUCCESS);
    }
}
