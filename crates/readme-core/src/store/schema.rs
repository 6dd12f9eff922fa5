use std::path::Path;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::{Error, Result};

/// Current schema version. Bump this when adding a migration step.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Open a connection with the pragmas every caller relies on.
pub fn open_connection(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::Store {
            message: format!("cannot create {}: {e}", parent.display()),
        })?;
    }

    let conn = Connection::open(db_path).map_err(Error::sqlite)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;",
    )
    .map_err(Error::sqlite)?;
    debug!(?db_path, "identity store connection opened");
    Ok(conn)
}

/// Refuse to work on a damaged database file.
pub fn quick_check(conn: &Connection) -> Result<()> {
    let result: String = conn
        .query_row("PRAGMA quick_check", [], |row| row.get(0))
        .map_err(Error::sqlite)?;
    if result != "ok" {
        return Err(Error::Store {
            message: format!("integrity check failed: {result}"),
        });
    }
    Ok(())
}

/// Run pending migrations up to [`CURRENT_SCHEMA_VERSION`].
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(Error::sqlite)?;

    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(Error::sqlite)?;

    type MigrationFn = fn(&Connection) -> Result<()>;

    let migrations: &[MigrationFn] = &[
        // V1: mapping table
        |conn| conn.execute_batch(MAPPINGS_SQL).map_err(Error::sqlite),
        // V2: lookup indexes for target path, hashes and filename
        |conn| conn.execute_batch(INDEXES_SQL).map_err(Error::sqlite),
    ];

    for version in (current + 1)..=CURRENT_SCHEMA_VERSION {
        let idx = (version - 1) as usize;
        if let Some(step) = migrations.get(idx) {
            step(conn)?;
        }
        conn.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(Error::sqlite)?;
        info!(version, "applied identity store migration");
    }
    Ok(())
}

const MAPPINGS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS file_mappings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_path TEXT NOT NULL UNIQUE,
    target_path TEXT NOT NULL,
    logical_name TEXT NOT NULL,
    canonical_filename TEXT NOT NULL,
    source_hash TEXT,
    target_hash TEXT,
    source_mtime REAL,
    target_mtime REAL,
    last_sync_time REAL,
    created_at REAL NOT NULL,
    updated_at REAL NOT NULL
);
"#;

const INDEXES_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_mappings_target ON file_mappings(target_path);
CREATE INDEX IF NOT EXISTS idx_mappings_source_hash ON file_mappings(source_hash);
CREATE INDEX IF NOT EXISTS idx_mappings_target_hash ON file_mappings(target_hash);
CREATE INDEX IF NOT EXISTS idx_mappings_filename ON file_mappings(lower(canonical_filename));
"#;
