//! [`TestWorkspace`] builder for sync scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use readme_fs::state;
use tempfile::TempDir;

/// A fixed point in time far enough in the past that tests can place edits
/// before and after it deterministically.
pub const EPOCH: f64 = 1_700_000_000.0;

/// A temporary directory holding `sources/`, `target/` and `home/`.
///
/// # Example
///
/// ```rust,no_run
/// use readme_test_utils::TestWorkspace;
///
/// let ws = TestWorkspace::new();
/// let readme = ws.add_project("alpha", "# Alpha\n");
/// ws.set_mtime(&readme, 100.0);
/// assert_eq!(ws.read(&readme), "# Alpha\n");
/// ```
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        for dir in ["sources", "target", "home"] {
            fs::create_dir_all(temp_dir.path().join(dir)).unwrap();
        }
        Self { temp_dir }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn source_root(&self) -> PathBuf {
        self.root().join("sources")
    }

    pub fn target_root(&self) -> PathBuf {
        self.root().join("target")
    }

    /// Directory used as the config home (`config.yaml`, `database.db`).
    pub fn home(&self) -> PathBuf {
        self.root().join("home")
    }

    pub fn config_file(&self) -> PathBuf {
        self.home().join("config.yaml")
    }

    pub fn database_file(&self) -> PathBuf {
        self.home().join("database.db")
    }

    /// An extra, initially empty source root next to `sources/`.
    pub fn add_source_root(&self, name: &str) -> PathBuf {
        let root = self.root().join(name);
        fs::create_dir_all(&root).unwrap();
        root
    }

    /// Write `sources/<project>/README.md`.
    pub fn add_project(&self, project: &str, content: &str) -> PathBuf {
        self.write_source(&format!("{project}/README.md"), content)
    }

    /// Write a file relative to `sources/`.
    pub fn write_source(&self, relative: &str, content: &str) -> PathBuf {
        write(&self.source_root().join(relative), content)
    }

    /// Write a file relative to `target/`.
    pub fn write_target(&self, relative: &str, content: &str) -> PathBuf {
        write(&self.target_root().join(relative), content)
    }

    pub fn target_path(&self, relative: &str) -> PathBuf {
        self.target_root().join(relative)
    }

    pub fn read(&self, path: &Path) -> String {
        fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Could not read {}: {e}", path.display()))
    }

    /// Set the modification time of `path` to `EPOCH + offset` seconds.
    pub fn set_mtime(&self, path: &Path, offset: f64) {
        state::set_mtime(path, EPOCH + offset).unwrap();
    }

    /// Overwrite `path` and stamp it at `EPOCH + offset`.
    pub fn edit(&self, path: &Path, content: &str, offset: f64) {
        write(path, content);
        self.set_mtime(path, offset);
    }

    /// Every `.md` file under `target/`, relative and sorted.
    pub fn target_files(&self) -> Vec<String> {
        let root = self.target_root();
        let mut found = Vec::new();
        collect_markdown(&root, &root, &mut found);
        found.sort();
        found
    }

    /// A minimal YAML config pointing at this workspace.
    pub fn config_yaml(&self, extra: &str) -> String {
        format!(
            "source_folders:\n  - path: {}\n    enabled: true\ntarget_folder: {}\n{extra}",
            self.source_root().display(),
            self.target_root().display(),
        )
    }

    /// Write [`config_yaml`](Self::config_yaml) to the config home.
    pub fn write_config(&self, extra: &str) -> PathBuf {
        write(&self.config_file(), &self.config_yaml(extra))
    }

    /// Assert that `path` (relative to `target/`) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_target_exists(&self, relative: &str) {
        let full_path = self.target_path(relative);
        assert!(
            full_path.exists(),
            "Expected mirror to exist: {}\nMirror contents: {:?}",
            full_path.display(),
            self.target_files()
        );
    }
}

fn write(path: &Path, content: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
    path.to_path_buf()
}

fn collect_markdown(root: &Path, dir: &Path, found: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_markdown(root, &path, found);
        } else if path.extension().is_some_and(|e| e == "md") {
            let relative = path.strip_prefix(root).unwrap();
            found.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
}
