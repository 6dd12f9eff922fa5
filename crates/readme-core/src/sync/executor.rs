//! Filesystem effects of a verdict, and the store bookkeeping that follows

use std::fs;

use readme_fs::{FileState, NormalizedPath, RobustnessConfig, io};
use tracing::info;

use crate::scanner::{Scanner, SourceCandidate};
use crate::store::{FileMapping, IdentityStore, SyncSnapshot};
use crate::{Error, Result};

/// The identity half of a mapping, independent of where it came from.
#[derive(Debug, Clone)]
pub(crate) struct Pair<'a> {
    pub source: &'a NormalizedPath,
    pub target: &'a NormalizedPath,
    pub logical_name: &'a str,
    pub canonical_filename: &'a str,
}

impl<'a> Pair<'a> {
    pub fn of_candidate(candidate: &'a SourceCandidate, target: &'a NormalizedPath) -> Self {
        Self {
            source: &candidate.source_path,
            target,
            logical_name: &candidate.logical_name,
            canonical_filename: &candidate.canonical_filename,
        }
    }

    pub fn of_mapping(mapping: &'a FileMapping) -> Self {
        Self {
            source: &mapping.source_path,
            target: &mapping.target_path,
            logical_name: &mapping.logical_name,
            canonical_filename: &mapping.canonical_filename,
        }
    }
}

pub(crate) struct Executor<'a> {
    pub store: &'a IdentityStore,
    pub scanner: &'a Scanner,
    pub robustness: RobustnessConfig,
}

impl Executor<'_> {
    fn target_root(&self) -> Result<NormalizedPath> {
        self.scanner
            .target_root()
            .map(NormalizedPath::new)
            .ok_or_else(|| Error::config("target folder is not set"))
    }

    /// Where the mirror of `candidate` lives, following a human's
    /// reorganization of the mirror instead of undoing it.
    ///
    /// May move or create the target file and retarget the mapping.
    pub fn resolve_target(
        &self,
        candidate: &SourceCandidate,
        mapping: Option<&FileMapping>,
    ) -> Result<NormalizedPath> {
        let root = self.target_root()?;
        let existing = self.scanner.find_existing_target(&candidate.canonical_filename);
        let mut target = existing
            .clone()
            .unwrap_or_else(|| root.join(&candidate.canonical_filename));

        let Some(mapping) = mapping else {
            return Ok(target);
        };
        let recorded = &mapping.target_path;
        if *recorded == target || !recorded.is_file() || self.scanner.is_quarantined(recorded) {
            return Ok(target);
        }

        if existing.is_some() || target.exists() {
            self.store.retarget(recorded, &target)?;
        } else if recorded.file_name() != target.file_name() {
            // Identity changed. A zero-byte source would match any other
            // empty file, so it gets a fresh mirror instead of a move.
            let source_empty = fs::metadata(candidate.source_path.to_native())
                .map(|m| m.len() == 0)
                .unwrap_or(false);
            if source_empty {
                self.copy(&candidate.source_path, &target, &root)?;
                info!(source = %candidate.source_path, target = %target, "empty source, new mirror created");
            } else {
                io::move_file(recorded.as_ref(), target.as_ref(), self.robustness)
                    .map_err(|e| Error::io_failure(recorded.to_native(), e))?;
                info!(from = %recorded, to = %target, "mirror renamed");
            }
            self.store.retarget(recorded, &target)?;
        } else {
            target = recorded.clone();
        }
        Ok(target)
    }

    /// Overwrite the target with the source and record the new baseline.
    pub fn push(&self, pair: &Pair<'_>) -> Result<()> {
        let root = self.target_root()?;
        self.copy(pair.source, pair.target, &root)?;
        info!(source = %pair.source, target = %pair.target, "synced source to target");
        self.record(pair)
    }

    /// Overwrite an existing source with the target and record the new baseline.
    pub fn pull(&self, pair: &Pair<'_>) -> Result<()> {
        if !pair.target.is_file() {
            return Err(Error::NotFound(format!("target {}", pair.target)));
        }
        if !pair.source.is_file() {
            return Err(Error::NotFound(format!("source {}", pair.source)));
        }
        io::copy_preserving(pair.target.as_ref(), pair.source.as_ref(), self.robustness)
            .map_err(|e| Error::io_failure(pair.source.to_native(), e))?;
        info!(target = %pair.target, source = %pair.source, "synced target to source");
        self.record(pair)
    }

    fn copy(&self, source: &NormalizedPath, target: &NormalizedPath, root: &NormalizedPath) -> Result<()> {
        if let Some(parent) = target.parent()
            && parent != *root
        {
            let parent = parent.to_native();
            fs::create_dir_all(&parent)
                .map_err(|e| Error::io_failure(&parent, readme_fs::Error::io(&parent, e)))?;
        }
        io::copy_preserving(source.as_ref(), target.as_ref(), self.robustness)
            .map_err(|e| Error::io_failure(target.to_native(), e))
    }

    /// Upsert the mapping for `pair` and stamp the live state of both sides
    /// as the new baseline.
    pub fn record(&self, pair: &Pair<'_>) -> Result<()> {
        self.link(pair)?;
        let snapshot = snapshot(pair.source, pair.target)?;
        self.store.touch(pair.source, &snapshot)?;
        Ok(())
    }

    /// Upsert the mapping for `pair`, keeping any baseline it already has.
    pub fn link(&self, pair: &Pair<'_>) -> Result<()> {
        let mut mapping = self.store.get_by_source(pair.source)?.unwrap_or_else(|| {
            FileMapping::new(
                pair.source.clone(),
                pair.target.clone(),
                pair.logical_name,
                pair.canonical_filename,
            )
        });
        mapping.target_path = pair.target.clone();
        mapping.logical_name = pair.logical_name.to_string();
        mapping.canonical_filename = pair.canonical_filename.to_string();
        self.store.put(&mapping)
    }
}

pub(crate) fn snapshot(source: &NormalizedPath, target: &NormalizedPath) -> Result<SyncSnapshot> {
    let source_state = FileState::read(source.as_ref())?;
    let target_state = FileState::read(target.as_ref())?;
    match (source_state, target_state) {
        (
            FileState {
                hash: Some(source_hash),
                mtime: Some(source_mtime),
                ..
            },
            FileState {
                hash: Some(target_hash),
                mtime: Some(target_mtime),
                ..
            },
        ) => Ok(SyncSnapshot {
            source_hash,
            target_hash,
            source_mtime,
            target_mtime,
        }),
        (source_state, _) => {
            let missing = if source_state.exists { target } else { source };
            Err(Error::NotFound(format!("{missing} vanished during sync")))
        }
    }
}
