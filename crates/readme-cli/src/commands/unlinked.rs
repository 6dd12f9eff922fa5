//! Unlinked mirror files

use colored::Colorize;

use crate::context::Context;
use crate::error::Result;

pub fn run_unlinked_list(ctx: &Context) -> Result<()> {
    let unlinked = ctx.engine()?.find_unlinked()?;
    if unlinked.is_empty() {
        println!("{}", "No unlinked files.".green());
        return Ok(());
    }
    for path in &unlinked {
        println!("  {} {}", "?".yellow(), path);
    }
    println!();
    println!(
        "{} unlinked files (use {} to quarantine them)",
        unlinked.len(),
        "readme-sync unlinked move".cyan()
    );
    Ok(())
}

pub fn run_unlinked_move(ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let moved = engine.quarantine_unlinked()?;
    let dir = engine
        .settings()
        .unlinked_dir()
        .map(|d| d.display().to_string())
        .unwrap_or_default();
    println!(
        "{} Moved {} files to {}",
        "=>".blue().bold(),
        moved.to_string().bold(),
        dir.cyan()
    );
    Ok(())
}
