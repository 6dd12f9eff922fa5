//! readme-sync CLI
//!
//! Keeps a flat folder of project READMEs in sync with the projects they
//! came from, in both directions.

mod cli;
mod commands;
mod context;
mod error;
mod interactive;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigAction, ConflictAction, UnlinkedAction};
use commands::SyncOptions;
use context::Context;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        // Completions need no configuration on disk.
        Some(Commands::Completions { shell }) => {
            print_completions(shell);
            Ok(())
        }
        Some(cmd) => {
            let ctx = Context::resolve(cli.config.as_deref())?;
            tracing::debug!(config = %ctx.config_file().display(), "resolved configuration");
            execute_command(&ctx, cmd)
        }
        None => {
            // No command provided - show help hint
            println!("{} README mirror", "readme-sync".green().bold());
            println!();
            println!("Run {} for available commands.", "readme-sync --help".cyan());
            Ok(())
        }
    }
}

/// `RUST_LOG` wins; otherwise warnings, or debug for our crates with `-v`.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,readme_core=debug,readme_fs=debug,readme_sync=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_completions(shell: clap_complete::Shell) {
    clap_complete::generate(shell, &mut Cli::command(), "readme-sync", &mut std::io::stdout());
}

fn execute_command(ctx: &Context, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init {
            target,
            sources,
            interactive,
        } => commands::run_init(ctx, target, sources, interactive),
        Commands::AddSource { path } => commands::run_add_source(ctx, &path),
        Commands::RemoveSource { path } => commands::run_remove_source(ctx, &path),
        Commands::EnableSource { path } => commands::run_set_source_enabled(ctx, &path, true),
        Commands::DisableSource { path } => commands::run_set_source_enabled(ctx, &path, false),
        Commands::SetTarget { path } => commands::run_set_target(ctx, &path),
        Commands::Sync {
            reverse,
            force,
            dry_run,
            json,
            yes,
        } => commands::run_sync(
            ctx,
            SyncOptions {
                reverse,
                force,
                dry_run,
                json,
                yes,
            },
        ),
        Commands::Status { json } => commands::run_status(ctx, json),
        Commands::Mappings { json } => commands::run_mappings(ctx, json),
        Commands::Scan => commands::run_scan(ctx),
        Commands::Conflicts { action } => match action {
            ConflictAction::List { json } => commands::run_conflicts_list(ctx, json),
            ConflictAction::Resolve { target, keep } => {
                commands::run_conflicts_resolve(ctx, &target, keep.into())
            }
            ConflictAction::Diff { target } => commands::run_conflicts_diff(ctx, &target),
        },
        Commands::Unlinked { action } => match action {
            UnlinkedAction::List => commands::run_unlinked_list(ctx),
            UnlinkedAction::Move => commands::run_unlinked_move(ctx),
        },
        Commands::Cleanup => commands::run_cleanup(ctx),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::run_config_show(ctx),
            ConfigAction::Get { key } => commands::run_config_get(ctx, &key),
            ConfigAction::Set { key, value } => commands::run_config_set(ctx, &key, &value),
        },
        Commands::Watch => commands::run_watch(ctx),
        Commands::Completions { shell } => {
            print_completions(shell);
            Ok(())
        }
    }
}
