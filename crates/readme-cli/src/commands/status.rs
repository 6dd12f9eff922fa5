//! Status command implementation

use colored::Colorize;
use serde::Serialize;

use readme_core::StatusReport;

use crate::commands::{format_time, print_problems};
use crate::context::Context;
use crate::error::Result;

#[derive(Debug, Serialize)]
struct FolderState {
    path: String,
    enabled: bool,
    exists: bool,
}

#[derive(Debug, Serialize)]
struct StatusOutput {
    config_file: String,
    target: Option<FolderState>,
    sources: Vec<FolderState>,
    #[serde(flatten)]
    report: StatusReport,
    problems: Vec<String>,
}

/// Run the status command
pub fn run_status(ctx: &Context, json: bool) -> Result<()> {
    let engine = ctx.engine()?;
    let settings = engine.settings();

    let output = StatusOutput {
        config_file: ctx.config_file().display().to_string(),
        target: settings.target_root().map(|root| FolderState {
            exists: root.is_dir(),
            path: root.display().to_string(),
            enabled: true,
        }),
        sources: settings
            .source_folders
            .iter()
            .map(|folder| {
                let root = readme_fs::expand_home(&folder.path.to_string_lossy());
                FolderState {
                    exists: root.is_dir(),
                    path: root.display().to_string(),
                    enabled: folder.enabled,
                }
            })
            .collect(),
        report: engine.get_status()?,
        problems: settings.validate(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", "README Sync Status".bold());
    println!();
    println!("{}:  {}", "Config".dimmed(), output.config_file);
    match &output.target {
        Some(target) => println!("{}:  {} {}", "Mirror".dimmed(), target.path, marker(target)),
        None => println!("{}:  {}", "Mirror".dimmed(), "not set".yellow()),
    }
    println!();

    println!("{}:", "Source Folders".bold());
    if output.sources.is_empty() {
        println!(
            "  {} (use {} to add)",
            "None".dimmed(),
            "readme-sync add-source".cyan()
        );
    }
    for folder in &output.sources {
        println!("  {} {}", marker(folder), folder.path);
    }
    println!();

    let report = &output.report;
    println!("{}:", "Mappings".bold());
    println!("  {}:        {}", "Total".dimmed(), report.total_mappings);
    println!("  {}:  {}", "Source files".dimmed(), report.source_files);
    println!("  {}:  {}", "Mirror files".dimmed(), report.target_files);
    println!("  {}:     {}", "Outdated".dimmed(), highlight(report.outdated_files));
    println!("  {}: {}", "Missing src".dimmed(), highlight(report.missing_source));
    println!("  {}: {}", "Missing dst".dimmed(), highlight(report.missing_target));
    println!("  {}:    {}", "Last sync".dimmed(), format_time(report.last_sync_time));

    if !output.problems.is_empty() {
        println!();
        println!("{}:", "Problems".bold());
        print_problems(&output.problems);
    }
    Ok(())
}

fn marker(folder: &FolderState) -> colored::ColoredString {
    match (folder.enabled, folder.exists) {
        (false, _) => "disabled".dimmed(),
        (true, true) => "ok".green(),
        (true, false) => "missing".red(),
    }
}

fn highlight(count: usize) -> colored::ColoredString {
    if count == 0 {
        count.to_string().normal()
    } else {
        count.to_string().yellow()
    }
}
