use super::{DecisionInputs, Verdict};
use crate::config::SourceNewerAction;

/// A named predicate that either settles the verdict or defers.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&DecisionInputs<'_>) -> Option<Verdict>,
}

pub(super) const CONTENT_CONVERGED: &str = "content-converged";

/// Evaluated top to bottom.
pub static RULES: &[Rule] = &[
    Rule {
        name: "source-missing",
        apply: |i| (!i.source.exists).then_some(Verdict::NoSync),
    },
    Rule {
        name: "target-missing",
        apply: |i| (!i.target.exists).then_some(Verdict::SourceToTarget),
    },
    Rule {
        name: CONTENT_CONVERGED,
        apply: |i| (i.source.hash == i.target.hash).then_some(Verdict::NoSync),
    },
    Rule {
        name: "target-only-changed",
        apply: |i| (!i.source_changed() && i.target_changed()).then_some(Verdict::TargetToSource),
    },
    Rule {
        name: "source-only-changed",
        apply: |i| (i.source_changed() && !i.target_changed()).then_some(Verdict::SourceToTarget),
    },
    // Both sides changed from here on until the "unchanged" rules.
    Rule {
        name: "dual-edit-target-recent",
        apply: |i| {
            let dual = i.source_changed() && i.target_changed();
            let since_source = i.source_mtime() - i.baseline.last_sync_time;
            let since_target = i.target_mtime() - i.baseline.last_sync_time;
            (dual && since_target > since_source && i.target_lead() > i.tolerance)
                .then_some(Verdict::NoSync)
        },
    },
    Rule {
        name: "dual-edit-source-recent",
        apply: |i| {
            let dual = i.source_changed() && i.target_changed();
            let since_source = i.source_mtime() - i.baseline.last_sync_time;
            let since_target = i.target_mtime() - i.baseline.last_sync_time;
            if !(dual && since_source > since_target && -i.target_lead() > i.tolerance) {
                return None;
            }
            Some(match i.tie_break.source_newer {
                SourceNewerAction::Sync => Verdict::SourceToTarget,
                SourceNewerAction::Conflict => Verdict::Conflict,
            })
        },
    },
    Rule {
        name: "dual-edit-within-tolerance",
        apply: |i| {
            if !(i.source_changed() && i.target_changed() && i.within_tolerance()) {
                return None;
            }
            Some(if i.tie_break.protect_target_on_tie {
                Verdict::NoSync
            } else {
                Verdict::Conflict
            })
        },
    },
    Rule {
        name: "dual-edit-target-newer",
        apply: |i| {
            (i.source_changed() && i.target_changed() && i.target_lead() > 0.0)
                .then_some(Verdict::NoSync)
        },
    },
    Rule {
        name: "dual-edit-source-newer",
        apply: |i| (i.source_changed() && i.target_changed()).then_some(Verdict::Conflict),
    },
    // Neither side differs from its baseline yet the contents disagree, e.g.
    // a baseline recorded from a partially applied copy.
    Rule {
        name: "unchanged-within-tolerance",
        apply: |i| i.within_tolerance().then_some(Verdict::NoSync),
    },
    Rule {
        name: "unchanged-target-newer",
        apply: |i| (i.target_lead() > 0.0).then_some(Verdict::NoSync),
    },
    Rule {
        name: "unchanged-source-newer",
        apply: |_| Some(Verdict::SourceToTarget),
    },
];
