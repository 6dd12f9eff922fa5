//! Normalized path handling
//!
//! Identity-store keys must compare equal regardless of how a path was spelled
//! when it was discovered (watch events, scanner walks, user input), so every
//! path crossing into the store goes through [`NormalizedPath`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A lexically cleaned path using forward slashes internally.
///
/// `.` segments and duplicate separators are dropped and `..` segments are
/// resolved against the preceding component. The filesystem is never consulted,
/// use [`NormalizedPath::canonical`] when symlinks must be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let raw = path.as_ref().to_string_lossy().replace('\\', "/");
        Self {
            inner: clean(&raw),
        }
    }

    /// Resolve symlinks and make the path absolute, falling back to the
    /// lexical form when the path does not exist.
    pub fn canonical(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match dunce::canonicalize(path) {
            Ok(resolved) => Self::new(resolved),
            Err(_) => Self::new(path),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    pub fn join(&self, segment: &str) -> Self {
        if self.inner.is_empty() {
            return Self::new(segment);
        }
        Self::new(format!("{}/{}", self.inner, segment))
    }

    pub fn parent(&self) -> Option<Self> {
        match self.inner.rfind('/') {
            Some(0) if self.inner.len() > 1 => Some(Self {
                inner: "/".to_string(),
            }),
            Some(idx) if idx > 0 => Some(Self {
                inner: self.inner[..idx].to_string(),
            }),
            _ => None,
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        let name = self.inner.rsplit('/').next()?;
        (!name.is_empty() && name != "..").then_some(name)
    }

    /// File name without its final extension.
    pub fn file_stem(&self) -> Option<&str> {
        let name = self.file_name()?;
        match name.rfind('.') {
            Some(idx) if idx > 0 => Some(&name[..idx]),
            _ => Some(name),
        }
    }

    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        let idx = name.rfind('.')?;
        (idx > 0).then(|| &name[idx + 1..])
    }

    /// Component-wise prefix test: `/a/bc` is not under `/a/b`.
    pub fn starts_with(&self, root: &NormalizedPath) -> bool {
        self.relative_to(root).is_some()
    }

    /// Path relative to `root`, or `None` when `self` is not under it.
    pub fn relative_to(&self, root: &NormalizedPath) -> Option<String> {
        let root = root.inner.trim_end_matches('/');
        if root.is_empty() {
            return self.inner.strip_prefix('/').map(str::to_string);
        }
        let rest = self.inner.strip_prefix(root)?;
        if rest.is_empty() {
            return Some(String::new());
        }
        rest.strip_prefix('/').map(str::to_string)
    }

    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }

    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }
}

fn clean(raw: &str) -> String {
    let absolute = raw.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() && !raw.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<NormalizedPath> for String {
    fn from(p: NormalizedPath) -> Self {
        p.inner
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Validate a single path segment such as a subfolder name.
///
/// Rejects empty names, traversal segments and anything containing a separator.
pub fn validate_path_identifier(value: &str) -> Result<()> {
    let reason = if value.trim().is_empty() {
        Some("must not be empty")
    } else if value == "." || value == ".." {
        Some("must not be a relative path segment")
    } else if value.contains('/') || value.contains('\\') {
        Some("must not contain path separators")
    } else if value.contains('\0') {
        Some("must not contain NUL bytes")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::InvalidIdentifier {
            value: value.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_resolves_dot_segments() {
        assert_eq!(NormalizedPath::new("/a/./b/../c").as_str(), "/a/c");
        assert_eq!(NormalizedPath::new("a//b/").as_str(), "a/b");
        assert_eq!(NormalizedPath::new("../x").as_str(), "../x");
        assert_eq!(NormalizedPath::new("/../x").as_str(), "/x");
    }

    #[test]
    fn backslashes_become_forward() {
        assert_eq!(NormalizedPath::new(r"dir\sub\file.md").as_str(), "dir/sub/file.md");
    }

    #[test]
    fn relative_to_respects_component_boundaries() {
        let root = NormalizedPath::new("/home/u/code");
        assert_eq!(
            NormalizedPath::new("/home/u/code/app/README.md").relative_to(&root),
            Some("app/README.md".to_string())
        );
        assert_eq!(NormalizedPath::new("/home/u/codex/README.md").relative_to(&root), None);
        assert!(NormalizedPath::new("/home/u/code").starts_with(&root));
    }

    #[test]
    fn stem_and_extension() {
        let p = NormalizedPath::new("/t/app-README.md");
        assert_eq!(p.file_stem(), Some("app-README"));
        assert_eq!(p.extension(), Some("md"));
        assert_eq!(NormalizedPath::new("/t/.hidden").extension(), None);
    }

    #[test]
    fn parent_of_root_child() {
        assert_eq!(NormalizedPath::new("/a").parent().unwrap().as_str(), "/");
        assert!(NormalizedPath::new("/").parent().is_none());
    }

    #[test]
    fn identifier_validation() {
        assert!(validate_path_identifier("unlinked").is_ok());
        assert!(validate_path_identifier("..").is_err());
        assert!(validate_path_identifier("a/b").is_err());
        assert!(validate_path_identifier("  ").is_err());
    }
}
