//! Core of readme-sync
//!
//! Keeps a flat mirror of README files in sync with the project trees they
//! come from, in both directions:
//!
//! - **Scanner**: finds source READMEs and derives the mirror filename
//! - **Identity store**: SQLite-backed mapping between each source and its mirror
//! - **Decision engine**: ordered rules classifying every pair
//! - **Sync engine**: applies verdicts, follows moved mirrors, quarantines unlinked files
//! - **Concurrency guard**: stops the two directions from re-triggering each other
//!
//! # Architecture
//!
//! ```text
//!                 readme-cli
//!                     |
//!                readme-core
//!       +------+------+------+------+
//!       |      |      |      |      |
//!    config scanner store decision sync --- guard/clock
//!                     |
//!                 readme-fs
//! ```
//!
//! # Example
//!
//! ```ignore
//! use readme_core::{ConfigHome, IdentityStore, SettingsStore, SyncEngine};
//!
//! fn example() -> readme_core::Result<()> {
//!     let home = ConfigHome::resolve(None)?;
//!     let settings = SettingsStore::new(home.config_file()).load()?;
//!     let store = IdentityStore::open(home.database_file())?;
//!     let report = SyncEngine::new(settings, store)?.sync_all()?;
//!     println!("{} synced", report.synced);
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod decision;
pub mod error;
pub mod guard;
pub mod scanner;
pub mod store;
pub mod sync;
pub mod watch;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    ConfigHome, ConflictPolicy, Settings, SettingsStore, SourceFolder, SourceNewerAction, TieBreak,
};
pub use decision::{Decision, Verdict, decide, resolve_conflict};
pub use error::{Error, Result};
pub use guard::{ConcurrencyGuard, Rejection, SyncPermit};
pub use scanner::{ScanResult, Scanner, SourceCandidate};
pub use store::{FileMapping, IdentityStore};
pub use sync::{ConflictEntry, FileOutcome, PlanEntry, ReverseReport, StatusReport, SyncEngine, SyncReport};
pub use watch::{Debouncer, EventAction, EventKind, Side, WatchEvent};
