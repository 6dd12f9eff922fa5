//! Command context
//!
//! Resolves where the configuration and identity store live, once per
//! invocation, so every command works from the same files.

use std::path::{Path, PathBuf};

use readme_core::{ConfigHome, IdentityStore, Settings, SettingsStore, SyncEngine};
use readme_fs::NormalizedPath;

use crate::error::Result;

#[derive(Debug)]
pub struct Context {
    home: ConfigHome,
    settings: SettingsStore,
}

impl Context {
    /// Resolve from `--config`, `$README_SYNC_HOME` or the platform default.
    pub fn resolve(config: Option<&Path>) -> Result<Self> {
        let home = ConfigHome::resolve(config)?;
        let settings = SettingsStore::new(home.config_file());
        Ok(Self { home, settings })
    }

    pub fn config_file(&self) -> &Path {
        self.home.config_file()
    }

    pub fn database_file(&self) -> &Path {
        self.home.database_file()
    }

    /// Load settings, writing defaults on first use.
    pub fn settings(&self) -> Result<Settings> {
        Ok(self.settings.load()?)
    }

    pub fn settings_store(&self) -> &SettingsStore {
        &self.settings
    }

    /// Build an engine over the current settings and identity store.
    pub fn engine(&self) -> Result<SyncEngine> {
        let settings = self.settings()?;
        let store = IdentityStore::open(self.database_file())?;
        Ok(SyncEngine::new(settings, store)?)
    }
}

/// Absolute, lexically normalized form of a path typed by the user.
pub fn user_path(path: &Path) -> NormalizedPath {
    let expanded = readme_fs::expand_home(&path.to_string_lossy());
    let absolute: PathBuf = std::path::absolute(&expanded).unwrap_or(expanded);
    NormalizedPath::new(absolute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_config_places_database_beside_it() {
        let dir = TempDir::new().unwrap();
        let ctx = Context::resolve(Some(&dir.path().join("config.yaml"))).unwrap();
        assert_eq!(ctx.database_file(), dir.path().join("database.db"));
    }

    #[test]
    fn first_load_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("config.yaml");
        let ctx = Context::resolve(Some(&file)).unwrap();

        let settings = ctx.settings().unwrap();

        assert!(settings.target_folder.is_none());
        assert!(file.exists());
    }

    #[test]
    fn user_path_is_absolute() {
        let path = user_path(Path::new("some/dir/../file.md"));
        assert!(path.to_native().is_absolute());
        assert!(path.as_str().ends_with("some/file.md"));
    }
}
