//! Mappings command implementation

use colored::Colorize;

use crate::commands::format_time;
use crate::context::Context;
use crate::error::Result;

/// List every source/mirror pair in the identity store.
pub fn run_mappings(ctx: &Context, json: bool) -> Result<()> {
    let mappings = ctx.engine()?.mappings()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&mappings)?);
        return Ok(());
    }

    if mappings.is_empty() {
        println!("{}", "No mappings yet.".dimmed());
        return Ok(());
    }

    for mapping in &mappings {
        let source_ok = mapping.source_path.is_file();
        let target_ok = mapping.target_path.is_file();
        let state = match (source_ok, target_ok) {
            (true, true) => "linked".green(),
            (false, _) => "source missing".red(),
            (true, false) => "mirror missing".yellow(),
        };
        println!("{} {} ({})", "=>".blue().bold(), mapping.logical_name.bold(), state);
        println!("   {}: {}", "Source".dimmed(), mapping.source_path);
        println!("   {}: {}", "Mirror".dimmed(), mapping.target_path);
        println!("   {}: {}", "Synced".dimmed(), format_time(mapping.last_sync_time));
    }
    println!();
    println!("{} mappings", mappings.len());
    Ok(())
}
