//! Results returned by the sync engine

use std::path::PathBuf;

use readme_fs::NormalizedPath;
use serde::Serialize;

use crate::decision::Verdict;
use crate::guard::Rejection;

/// What happened to one source/target pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
    Synced,
    ReverseSynced,
    NoChange,
    Conflict,
    /// The concurrency guard refused entry.
    Skipped,
    Error(String),
}

impl From<Rejection> for FileOutcome {
    fn from(_: Rejection) -> Self {
        Self::Skipped
    }
}

/// Counters for a full `sync_all` cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub scanned: usize,
    pub synced: usize,
    pub reverse_synced: usize,
    pub conflicts: usize,
    pub errors: usize,
    pub skipped: usize,
    pub moved_detected: usize,
    pub unlinked_moved: usize,
    pub orphans_purged: usize,
    /// Sources left out because another source claimed the same mirror name.
    pub ambiguous: usize,
    pub missing_roots: Vec<PathBuf>,
}

impl SyncReport {
    pub fn tally(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Synced => self.synced += 1,
            FileOutcome::ReverseSynced => self.reverse_synced += 1,
            FileOutcome::Conflict => self.conflicts += 1,
            FileOutcome::Skipped => self.skipped += 1,
            FileOutcome::Error(_) => self.errors += 1,
            FileOutcome::NoChange => {}
        }
    }

    /// Physical copies or moves performed.
    pub fn actions(&self) -> usize {
        self.synced + self.reverse_synced + self.moved_detected + self.unlinked_moved
    }
}

/// Counters for a target-to-source pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReverseReport {
    pub scanned: usize,
    pub synced: usize,
    pub errors: usize,
    pub no_mapping: usize,
}

/// A mapping whose two sides both moved away from the baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictEntry {
    pub source_path: NormalizedPath,
    pub target_path: NormalizedPath,
    pub source_mtime: f64,
    pub target_mtime: f64,
    pub last_sync_time: Option<f64>,
    pub source_newer: bool,
    pub target_newer: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusReport {
    pub total_mappings: usize,
    pub source_files: usize,
    pub target_files: usize,
    pub source_folders: usize,
    /// Mappings whose live content drifted from the baseline.
    pub outdated_files: usize,
    pub missing_source: usize,
    pub missing_target: usize,
    pub last_sync_time: Option<f64>,
}

/// Dry-run verdict for one pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanEntry {
    pub source_path: NormalizedPath,
    pub target_path: NormalizedPath,
    pub verdict: Verdict,
    pub rule: &'static str,
}
