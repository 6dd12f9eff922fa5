//! End-to-end properties of the sync engine
//!
//! Each test builds a real source tree and mirror in a temporary directory
//! and drives `SyncEngine` with a manual clock, so cooldown windows are
//! crossed explicitly rather than by sleeping.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use readme_core::{
    ConflictPolicy, EventAction, EventKind, FileOutcome, IdentityStore, ManualClock, Settings,
    Side, SourceFolder, SyncEngine, Verdict, WatchEvent,
};
use readme_fs::NormalizedPath;
use readme_test_utils::TestWorkspace;

struct Harness {
    ws: TestWorkspace,
    clock: Arc<ManualClock>,
    engine: SyncEngine,
}

impl Harness {
    fn new(ws: TestWorkspace, edit: impl FnOnce(&mut Settings)) -> Self {
        let mut settings = Settings::default();
        settings.source_folders.push(SourceFolder {
            path: ws.source_root(),
            enabled: true,
        });
        settings.target_folder = Some(ws.target_root());
        edit(&mut settings);

        let clock = Arc::new(ManualClock::new());
        let store = IdentityStore::open(ws.database_file()).unwrap();
        let engine = SyncEngine::with_clock(settings, store, clock.clone()).unwrap();
        Self { ws, clock, engine }
    }

    /// `alpha` at offset 0, synced once, cooldown elapsed.
    fn synced_alpha(edit: impl FnOnce(&mut Settings)) -> Self {
        let ws = TestWorkspace::new();
        let readme = ws.add_project("alpha", "# Alpha\n");
        ws.set_mtime(&readme, 0.0);
        let h = Self::new(ws, edit);
        h.engine.sync_all().unwrap();
        h.settle();
        h
    }

    fn settle(&self) {
        self.clock.advance(Duration::from_secs(4));
    }

    fn source(&self) -> PathBuf {
        self.ws.source_root().join("alpha/README.md")
    }

    fn mirror(&self) -> PathBuf {
        self.ws.target_path("alpha-README.md")
    }

    fn event(&self, path: &std::path::Path, side: Side) -> EventAction {
        self.engine
            .handle_event(&WatchEvent::new(path, EventKind::Modified, side))
            .unwrap()
    }
}

#[test]
fn second_run_without_changes_does_nothing() {
    let ws = TestWorkspace::new();
    ws.add_project("alpha", "# Alpha\n");
    ws.add_project("beta", "# Beta\n");
    ws.write_source("gamma/docs/README.md", "# Gamma\n");
    let h = Harness::new(ws, |_| {});

    let first = h.engine.sync_all().unwrap();
    h.settle();
    let second = h.engine.sync_all().unwrap();

    assert_eq!(first.synced, 3);
    assert_eq!(second.actions(), 0);
    assert_eq!(second.errors, 0);
}

#[test]
fn moving_a_mirror_into_a_subfolder_keeps_it_there() {
    let h = Harness::synced_alpha(|_| {});
    let moved = h.ws.target_path("projects/alpha-README.md");
    fs::create_dir_all(moved.parent().unwrap()).unwrap();
    fs::rename(h.mirror(), &moved).unwrap();

    h.engine.sync_all().unwrap();
    h.settle();
    h.engine.sync_all().unwrap();

    assert_eq!(h.ws.target_files(), vec!["projects/alpha-README.md"]);
    let mappings = h.engine.mappings().unwrap();
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].target_path, NormalizedPath::new(&moved));
}

#[test]
fn mirror_edit_reaches_the_source() {
    let h = Harness::synced_alpha(|_| {});
    h.ws.edit(&h.mirror(), "# Alpha\nwritten in the mirror\n", 100.0);

    let report = h.engine.sync_all().unwrap();

    assert_eq!(report.reverse_synced, 1);
    assert_eq!(h.ws.read(&h.source()), "# Alpha\nwritten in the mirror\n");
}

#[test]
fn near_simultaneous_edits_leave_the_mirror_alone() {
    let h = Harness::synced_alpha(|_| {});
    h.ws.edit(&h.source(), "source edit\n", 10.0);
    h.ws.edit(&h.mirror(), "mirror edit\n", 12.0);

    let plan = h.engine.plan().unwrap();
    assert_eq!(plan[0].verdict, Verdict::NoSync);
    assert_eq!(plan[0].rule, "dual-edit-within-tolerance");

    let report = h.engine.sync_all().unwrap();

    assert_eq!(report.conflicts, 0);
    assert_eq!(report.synced, 0);
    assert_eq!(h.ws.read(&h.mirror()), "mirror edit\n");
    assert_eq!(h.ws.read(&h.source()), "source edit\n");
}

#[test]
fn manual_policy_lists_dual_edits() {
    let h = Harness::synced_alpha(|s| {
        s.sync_settings.conflict_resolution = ConflictPolicy::Manual;
    });
    let tolerance = h.engine.settings().sync_settings.tolerance_seconds;
    h.ws.edit(&h.source(), "source edit\n", 10.0);
    h.ws.edit(&h.mirror(), "mirror edit\n", 10.0 + 2.0 * tolerance);

    let conflicts = h.engine.get_conflicts().unwrap();

    assert_eq!(conflicts.len(), 1);
    assert!(conflicts[0].target_newer);
    assert_eq!(conflicts[0].target_path, NormalizedPath::new(h.mirror()));
}

#[test]
fn rapid_alternating_edits_copy_at_most_once_per_direction() {
    let h = Harness::synced_alpha(|_| {});
    let mut pushes = 0;
    let mut pulls = 0;
    let mut count = |action: EventAction| match action {
        EventAction::Reconciled(FileOutcome::Synced) => pushes += 1,
        EventAction::Reconciled(FileOutcome::ReverseSynced) => pulls += 1,
        _ => {}
    };

    for step in 0..4 {
        let offset = 20.0 + step as f64;
        if step % 2 == 0 {
            h.ws.edit(&h.source(), &format!("source {step}\n"), offset);
            count(h.event(&h.source(), Side::Source));
        } else {
            h.ws.edit(&h.mirror(), &format!("mirror {step}\n"), offset);
            count(h.event(&h.mirror(), Side::Target));
        }
    }

    assert!(pushes <= 1, "{pushes} pushes");
    assert!(pulls <= 1, "{pulls} pulls");

    // Once the window passes the pair settles instead of bouncing.
    h.settle();
    h.event(&h.mirror(), Side::Target);
    h.settle();
    let quiet = h.engine.sync_all().unwrap();
    assert_eq!(quiet.actions(), 0);
}

#[test]
fn disabling_a_root_quarantines_its_mirrors() {
    let ws = TestWorkspace::new();
    ws.add_project("alpha", "# Alpha\n");
    let extra = ws.add_source_root("extra");
    fs::create_dir_all(extra.join("delta")).unwrap();
    fs::write(extra.join("delta/README.md"), "# Delta\n").unwrap();

    let both = Harness::new(ws, |s| {
        s.source_folders.push(SourceFolder {
            path: extra.clone(),
            enabled: true,
        });
    });
    both.engine.sync_all().unwrap();
    assert_eq!(both.engine.mappings().unwrap().len(), 2);

    let one = Harness::new(both.ws, |s| {
        s.source_folders.push(SourceFolder {
            path: extra.clone(),
            enabled: false,
        });
    });
    let report = one.engine.sync_all().unwrap();

    assert_eq!(report.orphans_purged, 1);
    assert_eq!(report.unlinked_moved, 1);
    assert_eq!(
        one.ws.target_files(),
        vec!["alpha-README.md", "unlinked/delta-README.md"]
    );
    assert_eq!(one.ws.read(&one.ws.target_path("unlinked/delta-README.md")), "# Delta\n");
    assert!(extra.join("delta/README.md").exists());
    assert_eq!(one.engine.mappings().unwrap().len(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn any_project_set_is_idempotent(
        names in prop::collection::btree_set("proj-[a-z0-9]{1,8}", 1..5)
    ) {
        let ws = TestWorkspace::new();
        for name in &names {
            ws.add_project(name, &format!("# {name}\n"));
        }
        let h = Harness::new(ws, |_| {});

        let first = h.engine.sync_all().unwrap();
        h.settle();
        let second = h.engine.sync_all().unwrap();

        prop_assert_eq!(first.synced, names.len());
        prop_assert_eq!(second.actions(), 0);
        prop_assert_eq!(h.ws.target_files().len(), names.len());
    }
}
