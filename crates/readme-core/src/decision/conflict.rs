use std::path::Path;

use tracing::warn;

use super::Verdict;
use crate::config::ConflictPolicy;

/// Turn a conflict into an actionable verdict under `policy`.
///
/// `Manual` leaves the conflict in place for a human to settle.
pub fn resolve_conflict(
    policy: ConflictPolicy,
    source_path: &Path,
    source_mtime: f64,
    target_mtime: f64,
) -> Verdict {
    match policy {
        ConflictPolicy::Latest => {
            if target_mtime > source_mtime {
                Verdict::NoSync
            } else {
                Verdict::SourceToTarget
            }
        }
        ConflictPolicy::SourcePriority => {
            warn!(
                source = %source_path.display(),
                "source_priority policy overwrites target edits"
            );
            Verdict::SourceToTarget
        }
        ConflictPolicy::TargetPriority => Verdict::NoSync,
        ConflictPolicy::Manual => Verdict::Conflict,
    }
}
