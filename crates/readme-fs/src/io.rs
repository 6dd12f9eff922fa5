//! Atomic I/O with advisory locking
//!
//! Writes never land in place: content goes to a temp file next to the
//! destination and is renamed over it, while the directory's
//! [`LOCK_FILE_NAME`] is held exclusively so writers into one directory
//! serialize. The lock file is never removed, so every writer locks the
//! same inode.

use std::fs::{self, File, FileTimes, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use fs2::FileExt;
use tracing::debug;

use crate::{Error, NormalizedPath, Result};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Advisory lock file kept in every directory written to.
pub const LOCK_FILE_NAME: &str = ".readme-sync.lock";

/// Tuning for lock acquisition and durability.
#[derive(Debug, Clone, Copy)]
pub struct RobustnessConfig {
    /// How long to keep retrying the destination lock before giving up.
    pub lock_timeout: Duration,
    /// Flush file contents to stable storage before the rename.
    pub enable_fsync: bool,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(10),
            enable_fsync: true,
        }
    }
}

/// Write `content` to `path` atomically.
pub fn write_atomic(path: &NormalizedPath, content: &[u8], config: RobustnessConfig) -> Result<()> {
    let native = path.to_native();
    replace_file(&native, config, |temp, temp_path| {
        temp.write_all(content).map_err(|e| Error::io(temp_path, e))
    })
}

pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native = path.to_native();
    fs::read_to_string(&native).map_err(|e| Error::io(&native, e))
}

/// Copy `src` over `dst`, carrying over modification/access times and
/// permissions so both sides report the same mtime afterwards.
pub fn copy_preserving(src: &Path, dst: &Path, config: RobustnessConfig) -> Result<()> {
    let metadata = fs::metadata(src).map_err(|e| Error::io(src, e))?;
    let modified = metadata.modified().map_err(|e| Error::io(src, e))?;
    let accessed = metadata.accessed().unwrap_or(modified);

    replace_file(dst, config, |temp, temp_path| {
        let mut reader = File::open(src).map_err(|e| Error::io(src, e))?;
        std::io::copy(&mut reader, temp).map_err(|e| Error::io(temp_path, e))?;
        temp.set_permissions(metadata.permissions())
            .map_err(|e| Error::io(temp_path, e))?;
        temp.set_times(FileTimes::new().set_modified(modified).set_accessed(accessed))
            .map_err(|e| Error::io(temp_path, e))
    })?;

    debug!(src = %src.display(), dst = %dst.display(), "copied with metadata");
    Ok(())
}

/// Move `src` to `dst`, creating parent directories. Falls back to
/// copy-then-delete when a rename is not possible (e.g. across devices).
pub fn move_file(src: &Path, dst: &Path, config: RobustnessConfig) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }
    copy_preserving(src, dst, config)?;
    fs::remove_file(src).map_err(|e| Error::io(src, e))
}

/// A destination inside `dir` for `file_name` that does not exist yet.
///
/// On collision the stem is suffixed with `_<stamp>`, then with a counter.
pub fn unique_destination(dir: &Path, file_name: &str, stamp: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match file_name.rfind('.') {
        Some(idx) if idx > 0 => (&file_name[..idx], &file_name[idx..]),
        _ => (file_name, ""),
    };
    let stamped = dir.join(format!("{stem}_{stamp}{ext}"));
    if !stamped.exists() {
        return stamped;
    }
    (1u32..)
        .map(|n| dir.join(format!("{stem}_{stamp}_{n}{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(stamped)
}

fn replace_file<F>(dst: &Path, config: RobustnessConfig, fill: F) -> Result<()>
where
    F: FnOnce(&mut File, &Path) -> Result<()>,
{
    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
    }

    let file_name = dst
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let lock_path = dst.with_file_name(LOCK_FILE_NAME);
    let temp_path = dst.with_file_name(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let lock = acquire_lock(&lock_path, dst, config.lock_timeout)?;

    let result = (|| {
        let mut temp = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| Error::io(&temp_path, e))?;
        fill(&mut temp, &temp_path)?;
        if config.enable_fsync {
            temp.sync_all().map_err(|e| Error::io(&temp_path, e))?;
        }
        drop(temp);
        fs::rename(&temp_path, dst).map_err(|e| Error::io(dst, e))
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    let _ = FileExt::unlock(&lock);
    result
}

fn acquire_lock(lock_path: &Path, target: &Path, timeout: Duration) -> Result<File> {
    let lock = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .map_err(|e| Error::io(lock_path, e))?;

    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(10))
        .with_max_interval(Duration::from_millis(200))
        .with_max_elapsed_time(Some(timeout))
        .build();

    backoff::retry(policy, || {
        lock.try_lock_exclusive()
            .map_err(backoff::Error::transient)
    })
    .map_err(|_| Error::LockFailed {
        path: target.to_path_buf(),
    })?;

    Ok(lock)
}
