//! Source and target folder management

use std::path::Path;

use colored::Colorize;

use crate::context::{Context, user_path};
use crate::error::{CliError, Result};

pub fn run_add_source(ctx: &Context, path: &Path) -> Result<()> {
    ctx.settings_store().update(|s| s.add_source(path))?;
    println!("{} Added source {}", "+".green(), user_path(path).as_str().cyan());
    Ok(())
}

pub fn run_remove_source(ctx: &Context, path: &Path) -> Result<()> {
    let mut removed = false;
    ctx.settings_store().update(|s| {
        removed = s.remove_source(path);
        Ok(())
    })?;
    if !removed {
        return Err(CliError::user(format!(
            "Not a configured source folder: {}",
            user_path(path)
        )));
    }
    println!("{} Removed source {}", "-".red(), user_path(path).as_str().cyan());
    println!(
        "Run {} to drop its mappings.",
        "readme-sync cleanup".cyan()
    );
    Ok(())
}

pub fn run_set_source_enabled(ctx: &Context, path: &Path, enabled: bool) -> Result<()> {
    ctx.settings_store()
        .update(|s| s.set_source_enabled(path, enabled))?;
    let state = if enabled {
        "enabled".green()
    } else {
        "disabled".yellow()
    };
    println!("{} Source {} {}", "=>".blue().bold(), user_path(path).as_str().cyan(), state);
    Ok(())
}

pub fn run_set_target(ctx: &Context, path: &Path) -> Result<()> {
    ctx.settings_store().update(|s| s.set_target(path))?;
    println!(
        "{} Mirror folder set to {}",
        "=>".blue().bold(),
        user_path(path).as_str().cyan()
    );
    Ok(())
}
