//! Typed settings
//!
//! The YAML file is loose; everything past this module works with
//! [`Settings`], which is fully defaulted on load and validated once.

mod exclusions;
mod home;
mod store;

pub use exclusions::ExclusionMatcher;
pub use home::ConfigHome;
pub use store::{SettingsStore, get_key, set_key};

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use readme_fs::{expand_home, validate_path_identifier};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Smallest accepted cleanup interval in seconds.
pub const MIN_CLEANUP_INTERVAL: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub version: String,
    pub source_folders: Vec<SourceFolder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_folder: Option<PathBuf>,
    pub sync_settings: SyncSettings,
    pub naming_rules: NamingRules,
    pub exclusions: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            source_folders: Vec::new(),
            target_folder: None,
            sync_settings: SyncSettings::default(),
            naming_rules: NamingRules::default(),
            exclusions: [
                "node_modules",
                ".git",
                "venv",
                "__pycache__",
                ".DS_Store",
                "*.tmp",
                "*.log",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFolder {
    pub path: PathBuf,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub conflict_resolution: ConflictPolicy,
    /// Window within which two mtimes count as simultaneous.
    pub tolerance_seconds: f64,
    /// Minimum spacing between two reconciliations of one source path.
    pub cooldown_seconds: f64,
    /// Seconds between scheduled full scans in watch mode.
    pub auto_sync_interval: u64,
    /// Seconds between guard sweeps and orphan purges in watch mode.
    pub cleanup_interval: u64,
    pub debounce_seconds: f64,
    pub move_unlinked_files: bool,
    pub unlinked_subfolder: String,
    pub tie_break: TieBreak,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            conflict_resolution: ConflictPolicy::Latest,
            tolerance_seconds: 5.0,
            cooldown_seconds: 3.0,
            auto_sync_interval: 300,
            cleanup_interval: 3600,
            debounce_seconds: 2.0,
            move_unlinked_files: true,
            unlinked_subfolder: "unlinked".to_string(),
            tie_break: TieBreak::default(),
        }
    }
}

/// Policy applied when the decision rules end in a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Keep the target when it is newer, otherwise overwrite it
    #[default]
    Latest,
    SourcePriority,
    TargetPriority,
    /// Leave the pair untouched and surface it
    Manual,
}

impl ConflictPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::SourcePriority => "source_priority",
            Self::TargetPriority => "target_priority",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "latest" => Ok(Self::Latest),
            "source_priority" => Ok(Self::SourcePriority),
            "target_priority" => Ok(Self::TargetPriority),
            "manual" => Ok(Self::Manual),
            other => Err(Error::config(format!("unknown conflict policy '{other}'"))),
        }
    }
}

/// Dual-modification tie-break knobs.
///
/// The defaults protect the mirror: edits made within the tolerance window of
/// each other keep the target, and a clearly newer source overwrites it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TieBreak {
    /// Both sides edited within the tolerance window: keep the target
    /// (`true`) or report a conflict (`false`).
    pub protect_target_on_tie: bool,
    /// Both sides edited and the source is newer beyond the tolerance window.
    pub source_newer: SourceNewerAction,
}

impl Default for TieBreak {
    fn default() -> Self {
        Self {
            protect_target_on_tie: true,
            source_newer: SourceNewerAction::Sync,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceNewerAction {
    #[default]
    Sync,
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingRules {
    /// Template with a `{project_name}` (or `{identity}`) placeholder.
    pub pattern: String,
    pub case_style: CaseStyle,
}

impl Default for NamingRules {
    fn default() -> Self {
        Self {
            pattern: "{project_name}-README".to_string(),
            case_style: CaseStyle::Keep,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaseStyle {
    #[default]
    Keep,
    Lower,
    Upper,
}

impl Settings {
    /// Expanded paths of every enabled source root.
    pub fn enabled_roots(&self) -> Vec<PathBuf> {
        self.source_folders
            .iter()
            .filter(|f| f.enabled)
            .map(|f| expand_path(&f.path))
            .collect()
    }

    /// Expanded target root, if one is configured.
    pub fn target_root(&self) -> Option<PathBuf> {
        self.target_folder
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .map(expand_path)
    }

    pub fn unlinked_dir(&self) -> Option<PathBuf> {
        self.target_root()
            .map(|root| root.join(&self.sync_settings.unlinked_subfolder))
    }

    /// Every problem with this configuration, empty when it is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        match self.target_root() {
            None => problems.push("target folder is not set".to_string()),
            Some(root) if !root.is_dir() => {
                problems.push(format!("target folder does not exist: {}", root.display()))
            }
            Some(_) => {}
        }

        let roots = self.enabled_roots();
        if roots.is_empty() {
            problems.push("no enabled source folder".to_string());
        }
        for root in roots.iter().filter(|r| !r.is_dir()) {
            problems.push(format!("source folder does not exist: {}", root.display()));
        }

        let sync = &self.sync_settings;
        if let Err(e) = validate_path_identifier(&sync.unlinked_subfolder) {
            problems.push(format!("unlinked_subfolder: {e}"));
        }
        if sync.cleanup_interval < MIN_CLEANUP_INTERVAL {
            problems.push(format!(
                "cleanup_interval must be at least {MIN_CLEANUP_INTERVAL} seconds"
            ));
        }
        if sync.tolerance_seconds < 0.0 || sync.cooldown_seconds < 0.0 || sync.debounce_seconds < 0.0 {
            problems.push("time windows must not be negative".to_string());
        }
        if !self.naming_rules.pattern.contains("{project_name}")
            && !self.naming_rules.pattern.contains("{identity}")
        {
            problems.push("naming pattern has no {project_name} placeholder".to_string());
        }

        problems
    }

    /// Fail with [`Error::ConfigInvalid`] unless a sync can run at all.
    ///
    /// Individual missing source roots are tolerated here; the scanner reports
    /// and skips them.
    pub fn ensure_runnable(&self) -> Result<()> {
        let fatal: Vec<String> = self
            .validate()
            .into_iter()
            .filter(|p| !p.starts_with("source folder does not exist"))
            .collect();
        if !fatal.is_empty() {
            return Err(Error::config(fatal.join("; ")));
        }
        if !self.enabled_roots().iter().any(|r| r.is_dir()) {
            return Err(Error::config("none of the enabled source folders exist"));
        }
        Ok(())
    }

    /// Register a source root, re-enabling it when it is already known.
    pub fn add_source(&mut self, path: &Path) -> Result<()> {
        let path = absolute(path);
        if !path.is_dir() {
            return Err(Error::config(format!(
                "source folder does not exist: {}",
                path.display()
            )));
        }
        match self.source_folders.iter_mut().find(|f| expand_path(&f.path) == path) {
            Some(existing) => existing.enabled = true,
            None => self.source_folders.push(SourceFolder {
                path,
                enabled: true,
            }),
        }
        Ok(())
    }

    /// Returns whether a folder was removed.
    pub fn remove_source(&mut self, path: &Path) -> bool {
        let path = absolute(path);
        let before = self.source_folders.len();
        self.source_folders.retain(|f| expand_path(&f.path) != path);
        before != self.source_folders.len()
    }

    pub fn set_source_enabled(&mut self, path: &Path, enabled: bool) -> Result<()> {
        let path = absolute(path);
        let folder = self
            .source_folders
            .iter_mut()
            .find(|f| expand_path(&f.path) == path)
            .ok_or_else(|| Error::NotFound(format!("source folder {}", path.display())))?;
        folder.enabled = enabled;
        Ok(())
    }

    /// Point the mirror at `path`, creating the directory.
    pub fn set_target(&mut self, path: &Path) -> Result<()> {
        let path = absolute(path);
        std::fs::create_dir_all(&path)
            .map_err(|e| Error::io_failure(&path, readme_fs::Error::io(&path, e)))?;
        self.target_folder = Some(path);
        Ok(())
    }
}

fn expand_path(path: &Path) -> PathBuf {
    expand_home(&path.to_string_lossy())
}

fn absolute(path: &Path) -> PathBuf {
    let expanded = expand_path(path);
    std::path::absolute(&expanded).unwrap_or(expanded)
}
