//! Init command implementation

use std::path::PathBuf;

use colored::Colorize;

use crate::commands::print_problems;
use crate::context::Context;
use crate::error::Result;
use crate::interactive::interactive_init;

/// Write the configuration, registering the given folders.
pub fn run_init(
    ctx: &Context,
    target: Option<PathBuf>,
    sources: Vec<PathBuf>,
    interactive: bool,
) -> Result<()> {
    let (target, sources) = if interactive {
        let current = ctx.settings()?.target_folder;
        let answers = interactive_init(current.as_ref())?;
        (Some(answers.target), answers.sources)
    } else {
        (target, sources)
    };

    let settings = ctx.settings_store().update(|settings| {
        if let Some(target) = &target {
            settings.set_target(target)?;
        }
        for source in &sources {
            settings.add_source(source)?;
        }
        Ok(())
    })?;

    println!(
        "{} Configuration written to {}",
        "=>".blue().bold(),
        ctx.config_file().display().to_string().cyan()
    );
    if let Some(target) = settings.target_root() {
        println!("   {}: {}", "Mirror".dimmed(), target.display());
    }
    for root in settings.enabled_roots() {
        println!("   {}: {}", "Source".dimmed(), root.display());
    }

    let problems = settings.validate();
    if problems.is_empty() {
        println!();
        println!("Run {} to mirror your READMEs.", "readme-sync sync".cyan());
    } else {
        println!();
        println!("{}", "Not ready to sync yet:".yellow());
        print_problems(&problems);
    }
    Ok(())
}
