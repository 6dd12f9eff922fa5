//! Verdicts for a (source, target) pair
//!
//! [`decide`] walks an ordered table of named rules; the first rule that
//! returns a verdict wins. The rules read live file state and the mapping's
//! last synchronized baseline and never touch the filesystem themselves.

mod conflict;
mod rules;

pub use conflict::resolve_conflict;
pub use rules::{RULES, Rule};

use std::fmt;

use readme_fs::FileState;
use serde::Serialize;
use tracing::debug;

use crate::config::TieBreak;
use crate::store::FileMapping;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    NoSync,
    SourceToTarget,
    TargetToSource,
    Conflict,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoSync => "no_sync",
            Self::SourceToTarget => "source_to_target",
            Self::TargetToSource => "target_to_source",
            Self::Conflict => "conflict",
        })
    }
}

/// The last state both sides were known to agree on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Baseline {
    pub source_hash: Option<String>,
    pub target_hash: Option<String>,
    pub last_sync_time: f64,
}

impl From<&FileMapping> for Baseline {
    fn from(mapping: &FileMapping) -> Self {
        Self {
            source_hash: mapping.source_hash.clone(),
            target_hash: mapping.target_hash.clone(),
            last_sync_time: mapping.last_sync_time.unwrap_or(0.0),
        }
    }
}

/// Everything a rule may look at.
#[derive(Debug, Clone)]
pub struct DecisionInputs<'a> {
    pub source: &'a FileState,
    pub target: &'a FileState,
    pub baseline: Baseline,
    pub tolerance: f64,
    pub tie_break: TieBreak,
}

impl DecisionInputs<'_> {
    /// A side counts as changed when its live hash differs from the baseline,
    /// or when there is no baseline at all.
    pub fn source_changed(&self) -> bool {
        changed(&self.baseline.source_hash, &self.source.hash)
    }

    pub fn target_changed(&self) -> bool {
        changed(&self.baseline.target_hash, &self.target.hash)
    }

    pub fn source_mtime(&self) -> f64 {
        self.source.mtime.unwrap_or(0.0)
    }

    pub fn target_mtime(&self) -> f64 {
        self.target.mtime.unwrap_or(0.0)
    }

    /// Signed `target_mtime - source_mtime`.
    pub fn target_lead(&self) -> f64 {
        self.target_mtime() - self.source_mtime()
    }

    pub fn within_tolerance(&self) -> bool {
        self.target_lead().abs() <= self.tolerance
    }
}

fn changed(baseline: &Option<String>, live: &Option<String>) -> bool {
    match baseline {
        Some(recorded) => live.as_ref() != Some(recorded),
        None => true,
    }
}

/// Outcome of [`decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub verdict: Verdict,
    /// Name of the rule that fired.
    pub rule: &'static str,
    /// Contents already agree; the baseline should be refreshed.
    pub converged: bool,
}

/// Classify the pair described by `inputs`.
pub fn decide(inputs: &DecisionInputs<'_>) -> Decision {
    for rule in RULES {
        if let Some(verdict) = (rule.apply)(inputs) {
            debug!(rule = rule.name, %verdict, "decision");
            return Decision {
                verdict,
                rule: rule.name,
                converged: rule.name == rules::CONTENT_CONVERGED,
            };
        }
    }
    // The table ends in unconditional rules; kept for exhaustiveness.
    Decision {
        verdict: Verdict::NoSync,
        rule: "fallthrough",
        converged: false,
    }
}
