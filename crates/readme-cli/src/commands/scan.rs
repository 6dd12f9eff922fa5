//! Scan command implementation

use colored::Colorize;

use crate::context::Context;
use crate::error::Result;

/// Show what a sync would pick up, without touching anything.
pub fn run_scan(ctx: &Context) -> Result<()> {
    let result = ctx.engine()?.scan();

    for root in &result.missing_roots {
        println!("{} source folder missing: {}", "!".yellow().bold(), root.display());
    }

    if result.candidates.is_empty() {
        println!("{}", "No README files found.".dimmed());
    }
    for candidate in &result.candidates {
        println!(
            "  {} {} {} {}",
            "+".green(),
            candidate.relative_path,
            "->".dimmed(),
            candidate.canonical_filename.cyan()
        );
    }

    for ambiguity in &result.ambiguities {
        println!();
        println!(
            "{} {} is claimed by several sources",
            "ambiguous:".yellow().bold(),
            ambiguity.canonical_filename.cyan()
        );
        println!("   {}: {}", "kept".green(), ambiguity.kept);
        for skipped in &ambiguity.skipped {
            println!("   {}: {}", "skipped".dimmed(), skipped);
        }
    }

    println!();
    println!("{} README files found", result.candidates.len());
    Ok(())
}
