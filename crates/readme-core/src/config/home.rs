//! Location of the settings file and identity store

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Environment variable overriding the configuration directory.
pub const HOME_ENV: &str = "README_SYNC_HOME";

const CONFIG_FILE: &str = "config.yaml";
const DATABASE_FILE: &str = "database.db";

/// Directory holding `config.yaml` and `database.db`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigHome {
    config_file: PathBuf,
    database_file: PathBuf,
}

impl ConfigHome {
    /// Resolve in order: explicit config file, `$README_SYNC_HOME`, the
    /// platform configuration directory.
    pub fn resolve(explicit_config: Option<&Path>) -> Result<Self> {
        if let Some(file) = explicit_config {
            let dir = file
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            return Ok(Self {
                config_file: file.to_path_buf(),
                database_file: dir.join(DATABASE_FILE),
            });
        }

        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::in_dir(PathBuf::from(dir)));
        }

        let base = dirs::config_dir()
            .ok_or_else(|| Error::config("cannot determine a configuration directory"))?;
        Ok(Self::in_dir(base.join("readme-sync")))
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            config_file: dir.join(CONFIG_FILE),
            database_file: dir.join(DATABASE_FILE),
        }
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn database_file(&self) -> &Path {
        &self.database_file
    }
}
