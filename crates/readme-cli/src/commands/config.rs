//! Config command implementation

use colored::Colorize;
use readme_core::config::{get_key, set_key};

use crate::context::Context;
use crate::error::{CliError, Result};

pub fn run_config_show(ctx: &Context) -> Result<()> {
    let settings = ctx.settings()?;
    println!("{} {}", "#".dimmed(), ctx.config_file().display().to_string().dimmed());
    print!("{}", serde_yaml::to_string(&settings)?);
    Ok(())
}

pub fn run_config_get(ctx: &Context, key: &str) -> Result<()> {
    let settings = ctx.settings()?;
    let value = get_key(&settings, key)?
        .ok_or_else(|| CliError::user(format!("Unknown configuration key: {key}")))?;
    match value {
        serde_yaml::Value::String(s) => println!("{s}"),
        other => print!("{}", serde_yaml::to_string(&other)?),
    }
    Ok(())
}

pub fn run_config_set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let store = ctx.settings_store();
    let updated = set_key(&store.load()?, key, value)?;
    store.save(&updated)?;
    println!("{} {} = {}", "=>".blue().bold(), key.cyan(), value);
    Ok(())
}
