//! Durable identity store
//!
//! One row per known source file, linking it to its mirror and recording the
//! last state both sides were known to agree on. A connection is opened per
//! call; concurrent writers are serialized by SQLite transactions.

mod schema;

pub use schema::CURRENT_SCHEMA_VERSION;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use readme_fs::{NormalizedPath, checksum, state::to_epoch_seconds};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use tracing::{debug, info};

use crate::{Error, Result};

/// A source file and its mirror.
///
/// Hash/mtime fields are the last synchronized baseline, not live values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileMapping {
    pub source_path: NormalizedPath,
    pub target_path: NormalizedPath,
    pub logical_name: String,
    pub canonical_filename: String,
    pub source_hash: Option<String>,
    pub target_hash: Option<String>,
    pub source_mtime: Option<f64>,
    pub target_mtime: Option<f64>,
    pub last_sync_time: Option<f64>,
    pub created_at: f64,
    pub updated_at: f64,
}

impl FileMapping {
    /// A mapping with no baseline yet.
    pub fn new(
        source_path: NormalizedPath,
        target_path: NormalizedPath,
        logical_name: impl Into<String>,
        canonical_filename: impl Into<String>,
    ) -> Self {
        Self {
            source_path,
            target_path,
            logical_name: logical_name.into(),
            canonical_filename: canonical_filename.into(),
            source_hash: None,
            target_hash: None,
            source_mtime: None,
            target_mtime: None,
            last_sync_time: None,
            created_at: 0.0,
            updated_at: 0.0,
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            source_path: NormalizedPath::new(row.get::<_, String>(0)?),
            target_path: NormalizedPath::new(row.get::<_, String>(1)?),
            logical_name: row.get(2)?,
            canonical_filename: row.get(3)?,
            source_hash: row.get(4)?,
            target_hash: row.get(5)?,
            source_mtime: row.get(6)?,
            target_mtime: row.get(7)?,
            last_sync_time: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

/// Live state of both sides right after they were reconciled.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSnapshot {
    pub source_hash: String,
    pub target_hash: String,
    pub source_mtime: f64,
    pub target_mtime: f64,
}

const COLUMNS: &str = "source_path, target_path, logical_name, canonical_filename, \
     source_hash, target_hash, source_mtime, target_mtime, last_sync_time, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct IdentityStore {
    db_path: PathBuf,
}

impl IdentityStore {
    /// Open (creating and migrating if needed) the store at `db_path`.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            db_path: db_path.into(),
        };
        let conn = store.connect()?;
        schema::quick_check(&conn)?;
        schema::migrate(&conn)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        schema::open_connection(&self.db_path)
    }

    fn query_one(&self, sql: &str, params: impl rusqlite::Params) -> Result<Option<FileMapping>> {
        let conn = self.connect()?;
        conn.query_row(sql, params, FileMapping::from_row)
            .optional()
            .map_err(Error::sqlite)
    }

    /// Insert or replace the row keyed by `source_path`.
    pub fn put(&self, mapping: &FileMapping) -> Result<()> {
        let now = now();
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO file_mappings (source_path, target_path, logical_name, canonical_filename,
                 source_hash, target_hash, source_mtime, target_mtime, last_sync_time, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
             ON CONFLICT(source_path) DO UPDATE SET
               target_path = excluded.target_path,
               logical_name = excluded.logical_name,
               canonical_filename = excluded.canonical_filename,
               source_hash = excluded.source_hash,
               target_hash = excluded.target_hash,
               source_mtime = excluded.source_mtime,
               target_mtime = excluded.target_mtime,
               last_sync_time = excluded.last_sync_time,
               updated_at = excluded.updated_at",
            params![
                mapping.source_path.as_str(),
                mapping.target_path.as_str(),
                mapping.logical_name,
                mapping.canonical_filename,
                mapping.source_hash,
                mapping.target_hash,
                mapping.source_mtime,
                mapping.target_mtime,
                mapping.last_sync_time,
                now,
            ],
        )
        .map_err(Error::sqlite)?;
        debug!(source = %mapping.source_path, target = %mapping.target_path, "mapping stored");
        Ok(())
    }

    pub fn get_by_source(&self, source_path: &NormalizedPath) -> Result<Option<FileMapping>> {
        self.query_one(
            &format!("SELECT {COLUMNS} FROM file_mappings WHERE source_path = ?1"),
            params![source_path.as_str()],
        )
    }

    pub fn get_by_target(&self, target_path: &NormalizedPath) -> Result<Option<FileMapping>> {
        self.query_one(
            &format!(
                "SELECT {COLUMNS} FROM file_mappings WHERE target_path = ?1
                 ORDER BY updated_at DESC LIMIT 1"
            ),
            params![target_path.as_str()],
        )
    }

    /// Mapping whose baseline on either side has `digest`.
    ///
    /// The empty-content digest never identifies a file and always yields `None`.
    pub fn get_by_hash(&self, digest: &str) -> Result<Option<FileMapping>> {
        if !checksum::is_identifying(digest) {
            return Ok(None);
        }
        self.query_one(
            &format!(
                "SELECT {COLUMNS} FROM file_mappings WHERE source_hash = ?1 OR target_hash = ?1
                 ORDER BY updated_at DESC LIMIT 1"
            ),
            params![digest],
        )
    }

    /// Case-insensitive lookup by canonical filename; the most recently
    /// updated mapping wins.
    pub fn get_by_filename(&self, filename: &str) -> Result<Option<FileMapping>> {
        self.query_one(
            &format!(
                "SELECT {COLUMNS} FROM file_mappings WHERE lower(canonical_filename) = lower(?1)
                 ORDER BY updated_at DESC LIMIT 1"
            ),
            params![filename],
        )
    }

    /// Point the mapping currently at `old_target` to `new_target`.
    pub fn retarget(&self, old_target: &NormalizedPath, new_target: &NormalizedPath) -> Result<bool> {
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE file_mappings SET target_path = ?1, updated_at = ?3 WHERE target_path = ?2",
                params![new_target.as_str(), old_target.as_str(), now()],
            )
            .map_err(Error::sqlite)?;
        if changed > 0 {
            info!(from = %old_target, to = %new_target, "mapping retargeted");
        }
        Ok(changed > 0)
    }

    /// Record `snapshot` as the new baseline and stamp `last_sync_time`.
    pub fn touch(&self, source_path: &NormalizedPath, snapshot: &SyncSnapshot) -> Result<bool> {
        let now = now();
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE file_mappings SET
                   source_hash = ?1, target_hash = ?2, source_mtime = ?3, target_mtime = ?4,
                   last_sync_time = ?5, updated_at = ?5
                 WHERE source_path = ?6",
                params![
                    snapshot.source_hash,
                    snapshot.target_hash,
                    snapshot.source_mtime,
                    snapshot.target_mtime,
                    now,
                    source_path.as_str(),
                ],
            )
            .map_err(Error::sqlite)?;
        Ok(changed > 0)
    }

    pub fn remove(&self, source_path: &NormalizedPath) -> Result<bool> {
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "DELETE FROM file_mappings WHERE source_path = ?1",
                params![source_path.as_str()],
            )
            .map_err(Error::sqlite)?;
        Ok(changed > 0)
    }

    /// All mappings, most recently updated first.
    pub fn all(&self) -> Result<Vec<FileMapping>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COLUMNS} FROM file_mappings ORDER BY updated_at DESC, source_path"
            ))
            .map_err(Error::sqlite)?;
        let rows = stmt
            .query_map([], FileMapping::from_row)
            .map_err(Error::sqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::sqlite)?;
        Ok(rows)
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.connect()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM file_mappings", [], |row| row.get(0))
            .map_err(Error::sqlite)?;
        Ok(count as usize)
    }

    /// Remove mappings whose source is gone or outside every enabled root.
    pub fn purge_orphans(&self, enabled_roots: &[PathBuf]) -> Result<usize> {
        let roots: Vec<(NormalizedPath, NormalizedPath)> = enabled_roots
            .iter()
            .map(|r| (NormalizedPath::new(r), NormalizedPath::canonical(r)))
            .collect();

        let mut removed = 0;
        for mapping in self.all()? {
            let source = &mapping.source_path;
            let reason = if !source.is_file() {
                Some("source missing")
            } else if !roots
                .iter()
                .any(|(lexical, canonical)| source.starts_with(lexical) || source.starts_with(canonical))
            {
                Some("outside enabled roots")
            } else {
                None
            };

            if let Some(reason) = reason {
                if self.remove(source)? {
                    info!(source = %source, reason, "orphan mapping purged");
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

fn now() -> f64 {
    to_epoch_seconds(SystemTime::now())
}
