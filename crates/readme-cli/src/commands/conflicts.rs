//! Conflict inspection and manual resolution

use std::path::Path;

use colored::Colorize;
use readme_core::Side;
use similar::{ChangeTag, TextDiff};

use crate::commands::format_time;
use crate::context::{Context, user_path};
use crate::error::{CliError, Result};

pub fn run_conflicts_list(ctx: &Context, json: bool) -> Result<()> {
    let conflicts = ctx.engine()?.get_conflicts()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conflicts)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("{}", "No conflicts.".green());
        return Ok(());
    }

    for conflict in &conflicts {
        let newer = if conflict.target_newer {
            "mirror newer"
        } else if conflict.source_newer {
            "source newer"
        } else {
            "same age"
        };
        println!("{} {} ({})", "!!".red().bold(), conflict.target_path, newer.yellow());
        println!("   {}: {}", "Source".dimmed(), conflict.source_path);
        println!(
            "   {}: {}",
            "Modified".dimmed(),
            format!(
                "source {}, mirror {}",
                format_time(Some(conflict.source_mtime)),
                format_time(Some(conflict.target_mtime))
            )
        );
        println!("   {}: {}", "Last sync".dimmed(), format_time(conflict.last_sync_time));
    }
    println!();
    println!(
        "{} conflicts (use {} to settle one)",
        conflicts.len(),
        "readme-sync conflicts resolve <FILE> --keep source|target".cyan()
    );
    Ok(())
}

pub fn run_conflicts_resolve(ctx: &Context, target: &Path, keep: Side) -> Result<()> {
    let path = user_path(target);
    ctx.engine()?.force_resolve(&path, keep)?;
    let kept = match keep {
        Side::Source => "source",
        Side::Target => "mirror",
    };
    println!("{} Resolved {} keeping the {}", "=>".blue().bold(), path.as_str().cyan(), kept);
    Ok(())
}

/// Print a unified diff from the source README to its mirror.
pub fn run_conflicts_diff(ctx: &Context, target: &Path) -> Result<()> {
    let path = user_path(target);
    let engine = ctx.engine()?;
    let mapping = engine
        .store()
        .get_by_target(&path)?
        .ok_or_else(|| CliError::user(format!("No mapping for {path}")))?;

    let source = read_or_empty(&mapping.source_path.to_native())?;
    let mirror = read_or_empty(&path.to_native())?;

    if source == mirror {
        println!("{}", "Contents are identical.".green());
        return Ok(());
    }

    print!("{}", render_diff(&source, &mirror, mapping.source_path.as_str(), path.as_str()));
    Ok(())
}

fn read_or_empty(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

fn render_diff(old: &str, new: &str, old_name: &str, new_name: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut out = String::new();
    out.push_str(&format!("{}\n{}\n", format!("--- {old_name}").red(), format!("+++ {new_name}").green()));
    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        out.push_str(&format!("{}\n", hunk.header().to_string().cyan()));
        for change in hunk.iter_changes() {
            let line = match change.tag() {
                ChangeTag::Delete => format!("-{}", change.value()).red().to_string(),
                ChangeTag::Insert => format!("+{}", change.value()).green().to_string(),
                ChangeTag::Equal => format!(" {}", change.value()),
            };
            out.push_str(&line);
            if change.missing_newline() {
                out.push('\n');
            }
        }
    }
    out
}
