//! `catalog` - list the built-in error patterns.

use anyhow::Result;
use clap::Args;
use mend_patterns::PatternCatalog;

use super::{print_json, OutputFormat};
use crate::ExitCodes;

#[derive(Args)]
pub struct CatalogArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

pub fn execute(args: CatalogArgs) -> Result<u8> {
    let catalog = PatternCatalog::builtin();

    if args.format == OutputFormat::Json {
        print_json(&catalog.patterns())?;
        return Ok(ExitCodes::SUCCESS);
    }

    println!("Error patterns (evaluated top to bottom, first match wins):");
    for (index, pattern) in catalog.patterns().iter().enumerate() {
        println!();
        println!("{:>2}. {} [{}]", index + 1, pattern.key, pattern.category);
        println!("    match: {}", pattern.matcher.source());
        if pattern.fixes.is_empty() {
            println!("    fixes: none (escalates)");
        }
        for fix in &pattern.fixes {
            println!(
                "    fix: {} ({:.2}){}",
                fix.name,
                fix.confidence,
                fix.remediation
                    .as_ref()
                    .map(|r| format!(" via '{}'", r))
                    .unwrap_or_default()
            );
        }
    }
    Ok(ExitCodes::SUCCESS)
}
