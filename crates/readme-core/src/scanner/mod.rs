//! Discovery of source READMEs and mirrored files

mod identity;

pub use identity::{UNKNOWN_IDENTITY, canonical_filename, extract_identity, sanitize};

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use ignore::{DirEntry, WalkBuilder};
use readme_fs::NormalizedPath;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{ExclusionMatcher, NamingRules, Settings};
use crate::{Error, Result};

/// An authoritative README and the mirror name it should have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCandidate {
    pub source_path: NormalizedPath,
    pub relative_path: String,
    pub logical_name: String,
    pub canonical_filename: String,
}

/// A Markdown file somewhere under the target root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetFile {
    pub path: NormalizedPath,
    pub relative_path: String,
    pub filename: String,
}

/// Sources sharing one canonical filename; only `kept` is synchronized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ambiguity {
    pub canonical_filename: String,
    pub kept: NormalizedPath,
    pub skipped: Vec<NormalizedPath>,
}

impl From<&Ambiguity> for Error {
    fn from(a: &Ambiguity) -> Self {
        Error::IdentityAmbiguous {
            canonical_filename: a.canonical_filename.clone(),
            kept: a.kept.to_native(),
            skipped: a.skipped.iter().map(NormalizedPath::to_native).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    pub candidates: Vec<SourceCandidate>,
    pub ambiguities: Vec<Ambiguity>,
    pub missing_roots: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Scanner {
    roots: Vec<PathBuf>,
    target_root: Option<PathBuf>,
    unlinked_subfolder: String,
    naming: NamingRules,
    exclusions: ExclusionMatcher,
}

impl Scanner {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            roots: settings.enabled_roots(),
            target_root: settings.target_root(),
            unlinked_subfolder: settings.sync_settings.unlinked_subfolder.clone(),
            naming: settings.naming_rules.clone(),
            exclusions: ExclusionMatcher::new(&settings.exclusions)?,
        })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn target_root(&self) -> Option<&Path> {
        self.target_root.as_deref()
    }

    pub fn canonical_filename(&self, identity: &str) -> String {
        canonical_filename(identity, &self.naming)
    }

    /// Build the candidate for one README path.
    pub fn candidate(&self, root: &Path, path: &Path) -> SourceCandidate {
        let logical_name = extract_identity(path);
        let canonical_filename = self.canonical_filename(&logical_name);
        let source_path = NormalizedPath::new(path);
        let relative_path = source_path
            .relative_to(&NormalizedPath::new(root))
            .unwrap_or_else(|| source_path.as_str().to_string());
        SourceCandidate {
            source_path,
            relative_path,
            logical_name,
            canonical_filename,
        }
    }

    /// Whether `path` is a README this scanner would pick up: named
    /// `README.md` in any case, under an enabled root, not excluded.
    pub fn classify_source(&self, path: &Path) -> Option<SourceCandidate> {
        let name = path.file_name()?.to_string_lossy();
        if !name.eq_ignore_ascii_case("readme.md") {
            return None;
        }
        let normalized = NormalizedPath::new(path);
        self.roots.iter().find_map(|root| {
            let relative = normalized.relative_to(&NormalizedPath::new(root))?;
            if self.exclusions.is_excluded(Path::new(&relative)) {
                return None;
            }
            Some(self.candidate(root, path))
        })
    }

    /// Every README under `root`, skipping excluded components.
    pub fn find_source_files(&self, root: &Path) -> Result<Vec<SourceCandidate>> {
        if !root.is_dir() {
            return Err(Error::NotFound(format!("source folder {}", root.display())));
        }

        let found = walk(root, Some(self.exclusions.clone()))
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .eq_ignore_ascii_case("readme.md")
            })
            .map(|entry| self.candidate(root, entry.path()))
            .collect::<Vec<_>>();

        debug!(root = %root.display(), count = found.len(), "scanned source folder");
        Ok(found)
    }

    /// Union over all enabled roots, de-duplicated by source path.
    ///
    /// Sources that collapse onto the same canonical filename (compared
    /// case-insensitively) are ambiguous: the first by path order is kept and
    /// the rest are reported, never merged.
    pub fn scan_all_sources(&self) -> ScanResult {
        let mut result = ScanResult::default();
        let mut seen = HashSet::new();
        let mut all = Vec::new();

        for root in &self.roots {
            match self.find_source_files(root) {
                Ok(found) => all.extend(found.into_iter().filter(|c| seen.insert(c.source_path.clone()))),
                Err(_) => {
                    warn!(root = %root.display(), "source folder missing, skipped");
                    result.missing_roots.push(root.clone());
                }
            }
        }
        all.sort_by(|a, b| a.source_path.cmp(&b.source_path));

        let mut by_name: BTreeMap<String, Vec<SourceCandidate>> = BTreeMap::new();
        for candidate in all {
            by_name
                .entry(candidate.canonical_filename.to_lowercase())
                .or_default()
                .push(candidate);
        }

        for (_, mut group) in by_name {
            let kept = group.remove(0);
            if !group.is_empty() {
                let ambiguity = Ambiguity {
                    canonical_filename: kept.canonical_filename.clone(),
                    kept: kept.source_path.clone(),
                    skipped: group.into_iter().map(|c| c.source_path).collect(),
                };
                warn!(error = %Error::from(&ambiguity), "ambiguous identity");
                result.ambiguities.push(ambiguity);
            }
            result.candidates.push(kept);
        }
        result
            .candidates
            .sort_by(|a, b| a.source_path.cmp(&b.source_path));
        result
    }

    /// Every `.md` file under the target root, including quarantined ones.
    pub fn scan_target_files(&self) -> Vec<TargetFile> {
        let Some(root) = self.target_root.as_deref().filter(|r| r.is_dir()) else {
            return Vec::new();
        };
        let normalized_root = NormalizedPath::new(root);

        walk(root, None)
            .filter(|entry| is_markdown(entry.path()))
            .map(|entry| {
                let path = NormalizedPath::new(entry.path());
                TargetFile {
                    relative_path: path.relative_to(&normalized_root).unwrap_or_default(),
                    filename: path.file_name().unwrap_or_default().to_string(),
                    path,
                }
            })
            .collect()
    }

    /// Whether a target path lies inside the quarantine folder.
    pub fn is_quarantined(&self, path: &NormalizedPath) -> bool {
        let Some(root) = self.target_root.as_deref() else {
            return false;
        };
        let unlinked = NormalizedPath::new(root.join(&self.unlinked_subfolder));
        path.starts_with(&unlinked)
    }

    /// Search the mirror (outside quarantine) for a file already representing
    /// `canonical_filename`: an exact name match wins over a case-insensitive
    /// match on the name without extension.
    pub fn find_existing_target(&self, canonical_filename: &str) -> Option<NormalizedPath> {
        let wanted_stem = stem(canonical_filename).to_lowercase();
        let mut loose = None;
        for file in self.scan_target_files() {
            if self.is_quarantined(&file.path) {
                continue;
            }
            if file.filename == canonical_filename {
                return Some(file.path);
            }
            if loose.is_none() && stem(&file.filename).to_lowercase() == wanted_stem {
                loose = Some(file.path);
            }
        }
        loose
    }
}

fn stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("md"))
        .unwrap_or(false)
}

/// Sorted walk yielding regular files, pruning excluded entries below `root`.
fn walk(root: &Path, exclusions: Option<ExclusionMatcher>) -> impl Iterator<Item = DirEntry> {
    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b));
    if let Some(matcher) = exclusions {
        builder.filter_entry(move |entry| {
            entry.depth() == 0 || !matcher.matches_name(&entry.file_name().to_string_lossy())
        });
    }

    builder.build().filter_map(|entry| match entry {
        Ok(entry) if entry.file_type().is_some_and(|t| t.is_file()) => Some(entry),
        Ok(_) => None,
        Err(e) => {
            warn!("walk error: {e}");
            None
        }
    })
}
