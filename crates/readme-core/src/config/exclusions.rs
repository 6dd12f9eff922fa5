//! Exclusion matching against individual path components

use std::path::{Component, Path};

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::{Error, Result};

/// Compiled exclusion patterns.
///
/// A path is excluded when any one of its components matches a pattern, so
/// `node_modules` prunes the directory wherever it appears and `*.log` drops
/// any log file.
#[derive(Debug, Clone)]
pub struct ExclusionMatcher {
    set: GlobSet,
}

impl ExclusionMatcher {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns.iter().filter(|p| !p.trim().is_empty()) {
            let glob = Glob::new(pattern.trim())
                .map_err(|e| Error::config(format!("bad exclusion pattern '{pattern}': {e}")))?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| Error::config(format!("cannot compile exclusions: {e}")))?;
        Ok(Self { set })
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.set.is_match(name)
    }

    /// Test each normal component of `relative`.
    pub fn is_excluded(&self, relative: &Path) -> bool {
        relative.components().any(|c| match c {
            Component::Normal(part) => self.matches_name(&part.to_string_lossy()),
            _ => false,
        })
    }
}
