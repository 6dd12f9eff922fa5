//! Command implementations for readme-cli

pub mod cleanup;
pub mod config;
pub mod conflicts;
pub mod init;
pub mod mappings;
pub mod scan;
pub mod sources;
pub mod status;
pub mod sync;
pub mod unlinked;
pub mod watch;

pub use cleanup::run_cleanup;
pub use config::{run_config_get, run_config_set, run_config_show};
pub use conflicts::{run_conflicts_diff, run_conflicts_list, run_conflicts_resolve};
pub use init::run_init;
pub use mappings::run_mappings;
pub use scan::run_scan;
pub use sources::{run_add_source, run_remove_source, run_set_source_enabled, run_set_target};
pub use status::run_status;
pub use sync::{SyncOptions, run_sync};
pub use unlinked::{run_unlinked_list, run_unlinked_move};
pub use watch::run_watch;

use colored::Colorize;

/// Local time for an epoch timestamp, or "never".
pub(crate) fn format_time(epoch: Option<f64>) -> String {
    epoch
        .and_then(|secs| chrono::DateTime::from_timestamp(secs as i64, 0))
        .map(|utc| {
            utc.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "never".to_string())
}

/// Print the configuration problems that stop a sync from running.
pub(crate) fn print_problems(problems: &[String]) {
    for problem in problems {
        println!("  {} {}", "!".yellow().bold(), problem);
    }
}
