//! Cleanup command implementation

use colored::Colorize;

use crate::context::Context;
use crate::error::Result;

/// Drop mappings whose source is gone or no longer under an enabled folder.
pub fn run_cleanup(ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let purged = engine.purge_orphans()?;
    let swept = engine.sweep_guard();
    tracing::debug!(swept, "guard entries evicted");
    println!("{} Removed {} orphaned mappings", "=>".blue().bold(), purged.to_string().bold());
    Ok(())
}
