//! Keeping the store consistent with the mirror as people left it

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Local;
use readme_fs::{NormalizedPath, RobustnessConfig, checksum, io};
use tracing::{info, warn};

use crate::scanner::Scanner;
use crate::store::IdentityStore;
use crate::{Error, Result};

/// Retarget mappings whose mirror was moved without notice.
///
/// A target file with no mapping of its own is looked up by content; the
/// mapping is only taken over when its recorded target no longer exists, so
/// a copy never steals the identity of a live mirror.
pub(crate) fn detect_moves(store: &IdentityStore, scanner: &Scanner) -> Result<usize> {
    let mut moved = 0;
    for file in scanner.scan_target_files() {
        if scanner.is_quarantined(&file.path) || store.get_by_target(&file.path)?.is_some() {
            continue;
        }
        let digest = match checksum::file_digest(file.path.as_ref()) {
            Ok(digest) => digest,
            Err(e) => {
                warn!(target = %file.path, error = %e, "cannot hash target");
                continue;
            }
        };
        let Some(mapping) = store.get_by_hash(&digest)? else {
            continue;
        };
        if mapping.target_path != file.path && !mapping.target_path.is_file() {
            store.retarget(&mapping.target_path, &file.path)?;
            moved += 1;
        }
    }
    Ok(moved)
}

/// Mirror files outside quarantine that no live source backs: untracked
/// files, and tracked files whose source is gone.
pub(crate) fn find_unlinked(store: &IdentityStore, scanner: &Scanner) -> Result<Vec<NormalizedPath>> {
    let mappings = store.all()?;
    let tracked: HashMap<&NormalizedPath, &NormalizedPath> = mappings
        .iter()
        .map(|m| (&m.target_path, &m.source_path))
        .collect();

    Ok(scanner
        .scan_target_files()
        .into_iter()
        .filter(|file| !scanner.is_quarantined(&file.path))
        .filter(|file| match tracked.get(&file.path) {
            None => true,
            Some(source) => !source.is_file(),
        })
        .map(|file| file.path)
        .collect())
}

/// Move one file into `dir`, suffixing a timestamp on name collisions.
pub(crate) fn quarantine_file(path: &NormalizedPath, dir: &Path, robustness: RobustnessConfig) -> Result<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| Error::NotFound(format!("file name of {path}")))?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let destination = io::unique_destination(dir, name, &stamp);
    io::move_file(path.as_ref(), &destination, robustness)
        .map_err(|e| Error::io_failure(path.to_native(), e))?;
    info!(from = %path, to = %destination.display(), "quarantined unlinked file");
    Ok(destination)
}

/// Quarantine every file in `files`; failures are logged and skipped.
pub(crate) fn quarantine_all(files: &[NormalizedPath], dir: &Path, robustness: RobustnessConfig) -> usize {
    files
        .iter()
        .filter(|path| match quarantine_file(path, dir, robustness) {
            Ok(_) => true,
            Err(e) => {
                warn!(path = %path, error = %e, "quarantine failed");
                false
            }
        })
        .count()
}
