//! Sync engine: the executor, reconciliation steps and the facade sequencing them
//!
//! - **executor**: copies bytes in the direction a verdict names and records the new baseline
//! - **reconcile**: move detection and quarantine of unlinked mirror files
//! - **engine**: full cycles, reverse passes, conflict queries and watch handling

mod engine;
mod executor;
mod reconcile;
mod report;

pub use engine::SyncEngine;
pub use report::{ConflictEntry, FileOutcome, PlanEntry, ReverseReport, StatusReport, SyncReport};
