//! Loading, saving and key-level editing of [`Settings`]

use std::path::Path;

use readme_fs::{ConfigStore, NormalizedPath};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use super::{MIN_CLEANUP_INTERVAL, Settings};
use crate::{Error, Result};

/// Settings persisted at one path; the format follows the file extension.
#[derive(Debug)]
pub struct SettingsStore {
    path: NormalizedPath,
    store: ConfigStore,
}

impl SettingsStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: NormalizedPath::new(path),
            store: ConfigStore::new(),
        }
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    /// Load the settings, writing defaults when the file does not exist.
    pub fn load(&self) -> Result<Settings> {
        match self.store.load_optional::<Settings>(&self.path)? {
            Some(settings) => {
                debug!(path = %self.path, "loaded settings");
                Ok(settings)
            }
            None => {
                let settings = Settings::default();
                self.save(&settings)?;
                info!(path = %self.path, "wrote default settings");
                Ok(settings)
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        self.store.save(&self.path, settings)?;
        Ok(())
    }

    /// Load, apply `edit`, save.
    pub fn update<F>(&self, edit: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings) -> Result<()>,
    {
        let mut settings = self.load()?;
        edit(&mut settings)?;
        self.save(&settings)?;
        Ok(settings)
    }
}

/// Look up a dotted key such as `sync_settings.tolerance_seconds`.
pub fn get_key(settings: &Settings, key: &str) -> Result<Option<Value>> {
    let mut current = serde_yaml::to_value(settings)?;
    for part in key.split('.') {
        current = match current {
            Value::Mapping(mut map) => match map.remove(part) {
                Some(v) => v,
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
    }
    Ok(Some(current))
}

/// Return a copy of `settings` with a dotted key replaced.
///
/// `raw` is parsed as a YAML scalar or flow collection, so `5`, `true` and
/// `[a, b]` keep their types. The result must still deserialize into
/// [`Settings`] and satisfy the interval and subfolder constraints.
pub fn set_key(settings: &Settings, key: &str, raw: &str) -> Result<Settings> {
    let value: Value = serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    let mut tree = serde_yaml::to_value(settings)?;

    let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
    let Some((last, parents)) = parts.split_last() else {
        return Err(Error::config("empty configuration key"));
    };

    let mut node = &mut tree;
    for part in parents {
        let Value::Mapping(map) = node else {
            return Err(Error::config(format!("'{key}' does not name a section")));
        };
        node = map
            .entry(Value::String((*part).to_string()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }
    let Value::Mapping(map) = node else {
        return Err(Error::config(format!("'{key}' does not name a section")));
    };
    map.insert(Value::String((*last).to_string()), value);

    let updated: Settings = serde_yaml::from_value(tree)
        .map_err(|e| Error::config(format!("invalid value for '{key}': {e}")))?;

    let sync = &updated.sync_settings;
    if sync.cleanup_interval < MIN_CLEANUP_INTERVAL {
        return Err(Error::config(format!(
            "cleanup_interval must be at least {MIN_CLEANUP_INTERVAL} seconds"
        )));
    }
    readme_fs::validate_path_identifier(&sync.unlinked_subfolder)
        .map_err(|e| Error::config(e.to_string()))?;

    Ok(updated)
}
