//! Interactive prompts for CLI commands
//!
//! Uses dialoguer for terminal-based input and confirmation.

use std::path::PathBuf;

use colored::Colorize;
use dialoguer::{Confirm, Input};

use crate::error::Result;

/// Folders chosen during `init --interactive`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitAnswers {
    pub target: PathBuf,
    pub sources: Vec<PathBuf>,
}

/// Default mirror location offered by the prompt.
fn default_target() -> String {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .map(|d| d.join("README-Sync").display().to_string())
        .unwrap_or_else(|| "README-Sync".to_string())
}

/// Prompt for the mirror folder and any number of source folders.
pub fn interactive_init(current_target: Option<&PathBuf>) -> Result<InitAnswers> {
    println!();

    let target: String = Input::new()
        .with_prompt("Mirror folder")
        .default(
            current_target
                .map(|t| t.display().to_string())
                .unwrap_or_else(default_target),
        )
        .interact_text()?;

    let mut sources = Vec::new();
    loop {
        let source: String = Input::new()
            .with_prompt("Source folder (empty to finish)")
            .allow_empty(true)
            .interact_text()?;
        let source = source.trim();
        if source.is_empty() {
            break;
        }
        sources.push(PathBuf::from(source));
    }

    println!();
    Ok(InitAnswers {
        target: PathBuf::from(target),
        sources,
    })
}

/// Ask before letting mirror content overwrite sources.
pub fn confirm_reverse() -> Result<bool> {
    println!(
        "{} Reverse sync copies mirror edits over the source READMEs.",
        "warning:".yellow().bold()
    );
    Ok(Confirm::new()
        .with_prompt("Continue?")
        .default(false)
        .interact()?)
}
