//! Sync command implementation

use colored::Colorize;
use readme_core::{PlanEntry, ReverseReport, SyncReport, Verdict};

use crate::context::Context;
use crate::error::Result;
use crate::interactive::confirm_reverse;

/// Flags of the `sync` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub reverse: bool,
    pub force: bool,
    pub dry_run: bool,
    pub json: bool,
    pub yes: bool,
}

/// Run the sync command
pub fn run_sync(ctx: &Context, options: SyncOptions) -> Result<()> {
    let engine = ctx.engine()?;

    if options.dry_run {
        let plan = engine.plan()?;
        if options.json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            print_plan(&plan);
        }
        return Ok(());
    }

    if options.reverse {
        if !options.force && !options.yes && !confirm_reverse()? {
            println!("{}", "Aborted.".dimmed());
            return Ok(());
        }
        let report = engine.reverse_sync_from_target(options.force)?;
        if options.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_reverse(&report);
        }
        return Ok(());
    }

    let report = engine.sync_all()?;
    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_plan(plan: &[PlanEntry]) {
    println!("{} {}", "=>".blue().bold(), "Dry run".bold());
    let pending: Vec<&PlanEntry> = plan
        .iter()
        .filter(|e| e.verdict != Verdict::NoSync)
        .collect();
    if pending.is_empty() {
        println!("   {}", "Everything is in sync".green());
        return;
    }
    for entry in &pending {
        let arrow = match entry.verdict {
            Verdict::SourceToTarget => "->".green(),
            Verdict::TargetToSource => "<-".cyan(),
            Verdict::Conflict => "!!".red().bold(),
            Verdict::NoSync => "==".dimmed(),
        };
        println!(
            "   {} {} {} ({})",
            entry.source_path,
            arrow,
            entry.target_path,
            entry.rule.dimmed()
        );
    }
    println!();
    println!("{} of {} pairs would change", pending.len(), plan.len());
}

fn print_report(report: &SyncReport) {
    println!("{} {}", "=>".blue().bold(), "Sync complete".bold());
    println!("   {}: {}", "Scanned".dimmed(), report.scanned);
    println!("   {}: {}", "Synced".dimmed(), report.synced.to_string().green());
    println!("   {}: {}", "Reverse synced".dimmed(), report.reverse_synced.to_string().cyan());
    if report.moved_detected > 0 {
        println!("   {}: {}", "Moves followed".dimmed(), report.moved_detected);
    }
    if report.unlinked_moved > 0 {
        println!("   {}: {}", "Quarantined".dimmed(), report.unlinked_moved);
    }
    if report.orphans_purged > 0 {
        println!("   {}: {}", "Orphans purged".dimmed(), report.orphans_purged);
    }
    if report.skipped > 0 {
        println!("   {}: {}", "Skipped".dimmed(), report.skipped);
    }
    if report.conflicts > 0 {
        println!(
            "   {}: {} (see {})",
            "Conflicts".dimmed(),
            report.conflicts.to_string().red().bold(),
            "readme-sync conflicts list".cyan()
        );
    }
    if report.ambiguous > 0 {
        println!(
            "   {}: {} (see {})",
            "Ambiguous".dimmed(),
            report.ambiguous.to_string().yellow(),
            "readme-sync scan".cyan()
        );
    }
    if report.errors > 0 {
        println!("   {}: {}", "Errors".dimmed(), report.errors.to_string().red().bold());
    }
    for root in &report.missing_roots {
        println!("   {} source folder missing: {}", "!".yellow().bold(), root.display());
    }
}

fn print_reverse(report: &ReverseReport) {
    println!("{} {}", "=>".blue().bold(), "Reverse sync complete".bold());
    println!("   {}: {}", "Scanned".dimmed(), report.scanned);
    println!("   {}: {}", "Synced".dimmed(), report.synced.to_string().cyan());
    if report.no_mapping > 0 {
        println!("   {}: {}", "Without source".dimmed(), report.no_mapping.to_string().yellow());
    }
    if report.errors > 0 {
        println!("   {}: {}", "Errors".dimmed(), report.errors.to_string().red().bold());
    }
}
