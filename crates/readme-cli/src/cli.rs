//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use readme_core::Side;

/// readme-sync - Keep a flat mirror of project READMEs in sync, both ways
#[derive(Parser, Debug)]
#[command(name = "readme-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "README_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Write a configuration file
    ///
    /// Examples:
    ///   readme-sync init --target ~/Documents/README-Sync --source ~/code
    ///   readme-sync init --interactive
    Init {
        /// Folder receiving the mirrored READMEs
        #[arg(short, long)]
        target: Option<PathBuf>,

        /// Project roots to scan (repeatable)
        #[arg(short, long = "source")]
        sources: Vec<PathBuf>,

        /// Prompt for the folders
        #[arg(short, long)]
        interactive: bool,
    },

    /// Register a source folder
    AddSource {
        /// Folder to scan for READMEs
        path: PathBuf,
    },

    /// Forget a source folder
    RemoveSource {
        /// Folder to remove
        path: PathBuf,
    },

    /// Re-enable a disabled source folder
    EnableSource {
        /// Folder to enable
        path: PathBuf,
    },

    /// Stop scanning a source folder without forgetting it
    DisableSource {
        /// Folder to disable
        path: PathBuf,
    },

    /// Set the mirror folder
    SetTarget {
        /// Folder receiving the mirrored READMEs
        path: PathBuf,
    },

    /// Synchronize sources and the mirror
    Sync {
        /// Copy mirror edits back to their sources only
        #[arg(long)]
        reverse: bool,

        /// With --reverse: overwrite every source, skip the prompt
        #[arg(long)]
        force: bool,

        /// Preview the verdicts without touching files
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,

        /// Answer yes to the reverse-sync prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show mapping counts and folder health
    Status {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// List source/mirror mappings
    Mappings {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Preview which READMEs would be mirrored
    Scan,

    /// Inspect and resolve conflicts
    Conflicts {
        #[command(subcommand)]
        action: ConflictAction,
    },

    /// Mirror files with no live source
    Unlinked {
        #[command(subcommand)]
        action: UnlinkedAction,
    },

    /// Drop mappings whose source is gone or outside every enabled folder
    Cleanup,

    /// Show or edit configuration values
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Watch sources and the mirror and sync on change
    Watch,

    /// Generate shell completions
    ///
    /// Examples:
    ///   readme-sync completions bash > ~/.local/share/bash-completion/completions/readme-sync
    ///   readme-sync completions zsh > ~/.zfunc/_readme-sync
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Conflict subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConflictAction {
    /// List pairs where both sides changed since the last sync
    List {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Settle one pair by keeping one side
    Resolve {
        /// Mirror file of the pair
        target: PathBuf,

        /// Side whose content wins
        #[arg(long, value_enum)]
        keep: KeepSide,
    },

    /// Show a unified diff between source and mirror
    Diff {
        /// Mirror file of the pair
        target: PathBuf,
    },
}

/// Unlinked-file subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum UnlinkedAction {
    /// List mirror files with no live source
    List,
    /// Move them into the quarantine folder
    Move,
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the whole configuration
    Show,
    /// Print one dotted key
    Get {
        /// Key such as sync_settings.tolerance_seconds
        key: String,
    },
    /// Replace one dotted key
    Set {
        /// Key such as sync_settings.tolerance_seconds
        key: String,
        /// New value, parsed as YAML
        value: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepSide {
    Source,
    Target,
}

impl From<KeepSide> for Side {
    fn from(keep: KeepSide) -> Self {
        match keep {
            KeepSide::Source => Side::Source,
            KeepSide::Target => Side::Target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("readme-sync").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn no_command_is_allowed() {
        assert!(parse(&[]).command.is_none());
    }

    #[test]
    fn init_collects_repeated_sources() {
        let cli = parse(&["init", "--target", "/m", "-s", "/a", "--source", "/b"]);
        assert_eq!(
            cli.command,
            Some(Commands::Init {
                target: Some(PathBuf::from("/m")),
                sources: vec![PathBuf::from("/a"), PathBuf::from("/b")],
                interactive: false,
            })
        );
    }

    #[test]
    fn sync_flags() {
        let cli = parse(&["sync", "--reverse", "--force", "--json"]);
        assert_eq!(
            cli.command,
            Some(Commands::Sync {
                reverse: true,
                force: true,
                dry_run: false,
                json: true,
                yes: false,
            })
        );
    }

    #[test]
    fn global_options_after_subcommand() {
        let cli = parse(&["status", "--config", "/tmp/c.yaml", "-v"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.yaml")));
        assert!(cli.verbose);
    }

    #[test]
    fn conflicts_resolve_requires_keep() {
        assert!(
            Cli::try_parse_from(["readme-sync", "conflicts", "resolve", "/m/a.md"]).is_err()
        );
        let cli = parse(&["conflicts", "resolve", "/m/a.md", "--keep", "target"]);
        assert_eq!(
            cli.command,
            Some(Commands::Conflicts {
                action: ConflictAction::Resolve {
                    target: PathBuf::from("/m/a.md"),
                    keep: KeepSide::Target,
                }
            })
        );
    }

    #[test]
    fn config_set_takes_key_and_value() {
        let cli = parse(&["config", "set", "sync_settings.tolerance_seconds", "5"]);
        assert_eq!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Set {
                    key: "sync_settings.tolerance_seconds".into(),
                    value: "5".into(),
                }
            })
        );
    }

    #[test]
    fn unknown_keep_side_is_rejected() {
        assert!(
            Cli::try_parse_from(["readme-sync", "conflicts", "resolve", "x", "--keep", "both"])
                .is_err()
        );
    }
}
