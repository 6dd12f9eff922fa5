//! Logical identity of a source README

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::{CaseStyle, NamingRules};

/// Identity used when sanitizing leaves nothing.
pub const UNKNOWN_IDENTITY: &str = "unknown-project";

/// Container folder names that rarely name a project on their own.
const GENERIC_DIRS: &[&str] = &["src", "docs", "doc", "documentation", "scripts"];

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\-_\x{4e00}-\x{9fff}]").unwrap());
static DASH_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").unwrap());

/// Derive the project identity of the README at `path`.
///
/// The parent directory names the project. A generic container such as
/// `docs` defers to its own parent, but only when it has no sibling
/// directories; a `scripts` folder next to other folders is treated as a
/// category holding one project of its own.
pub fn extract_identity(path: &Path) -> String {
    let Some(parent) = path.parent() else {
        return UNKNOWN_IDENTITY.to_string();
    };
    let parent_name = parent
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut name = parent_name.clone();
    if GENERIC_DIRS.contains(&parent_name.to_lowercase().as_str()) {
        if let Some(grandparent) = parent.parent().filter(|g| g.is_dir()) {
            if !has_sibling_dirs(grandparent, &parent_name) {
                if let Some(upper) = grandparent.file_name() {
                    name = upper.to_string_lossy().into_owned();
                }
            }
        }
    }

    sanitize(&name)
}

fn has_sibling_dirs(grandparent: &Path, own_name: &str) -> bool {
    let Ok(entries) = std::fs::read_dir(grandparent) else {
        return false;
    };
    entries.filter_map(|e| e.ok()).any(|entry| {
        entry.file_type().map(|t| t.is_dir()).unwrap_or(false)
            && entry.file_name().to_string_lossy() != own_name
    })
}

/// Restrict `raw` to letters, digits, `-`, `_` and CJK ideographs.
pub fn sanitize(raw: &str) -> String {
    let replaced = DISALLOWED.replace_all(raw, "-");
    let trimmed = replaced.trim_matches('-');
    let collapsed = DASH_RUNS.replace_all(trimmed, "-");
    if collapsed.is_empty() {
        UNKNOWN_IDENTITY.to_string()
    } else {
        collapsed.into_owned()
    }
}

/// Target filename for `identity` under `rules`; always ends in `.md`.
pub fn canonical_filename(identity: &str, rules: &NamingRules) -> String {
    let rendered = rules
        .pattern
        .replace("{project_name}", identity)
        .replace("{identity}", identity);
    let flat = rendered.rsplit(['/', '\\']).next().unwrap_or(rendered.as_str());

    let mut name = match rules.case_style {
        CaseStyle::Keep => flat.to_string(),
        CaseStyle::Lower => flat.to_lowercase(),
        CaseStyle::Upper => flat.to_uppercase(),
    };
    if !name.to_lowercase().ends_with(".md") {
        name.push_str(".md");
    }
    name
}
