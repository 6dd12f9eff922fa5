//! Live file state probes

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::{Error, Result, checksum};

/// Existence, modification time and digest of a file, read fresh from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct FileState {
    pub exists: bool,
    /// Seconds since the Unix epoch.
    pub mtime: Option<f64>,
    pub hash: Option<String>,
}

impl FileState {
    pub fn missing() -> Self {
        Self {
            exists: false,
            mtime: None,
            hash: None,
        }
    }

    /// Probe `path`. A missing file is not an error.
    pub fn read(path: &Path) -> Result<Self> {
        let metadata = match std::fs::metadata(path) {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Ok(Self::missing()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::missing()),
            Err(e) => return Err(Error::io(path, e)),
        };
        let mtime = metadata.modified().map_err(|e| Error::io(path, e))?;
        Ok(Self {
            exists: true,
            mtime: Some(to_epoch_seconds(mtime)),
            hash: Some(checksum::file_digest(path)?),
        })
    }
}

pub fn to_epoch_seconds(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

pub fn from_epoch_seconds(seconds: f64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs_f64(seconds.max(0.0))
}

/// Modification time of `path` in epoch seconds.
pub fn mtime(path: &Path) -> Result<f64> {
    let metadata = std::fs::metadata(path).map_err(|e| Error::io(path, e))?;
    let modified = metadata.modified().map_err(|e| Error::io(path, e))?;
    Ok(to_epoch_seconds(modified))
}

/// Set the modification time of an existing file.
pub fn set_mtime(path: &Path, seconds: f64) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    file.set_modified(from_epoch_seconds(seconds))
        .map_err(|e| Error::io(path, e))
}
