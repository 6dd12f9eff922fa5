//! Tests for the SyncEngine facade

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use readme_core::config::CaseStyle;
use readme_core::{
    ConflictPolicy, Error, FileOutcome, IdentityStore, ManualClock, Settings, Side, SourceFolder,
    SourceNewerAction, SyncEngine, Verdict,
};
use readme_fs::NormalizedPath;
use readme_test_utils::TestWorkspace;

fn engine_with(ws: &TestWorkspace, edit: impl FnOnce(&mut Settings)) -> (Arc<ManualClock>, SyncEngine) {
    let mut settings = Settings::default();
    settings.source_folders.push(SourceFolder {
        path: ws.source_root(),
        enabled: true,
    });
    settings.target_folder = Some(ws.target_root());
    edit(&mut settings);

    let store = IdentityStore::open(ws.database_file()).unwrap();
    let clock = Arc::new(ManualClock::new());
    let engine = SyncEngine::with_clock(settings, store, clock.clone()).unwrap();
    (clock, engine)
}

fn engine(ws: &TestWorkspace) -> (Arc<ManualClock>, SyncEngine) {
    engine_with(ws, |_| {})
}

fn past_cooldown(clock: &ManualClock) {
    clock.advance(Duration::from_secs(4));
}

/// Project `alpha` synced once, both sides stamped at offset 0.
fn synced_alpha(ws: &TestWorkspace) -> (Arc<ManualClock>, SyncEngine) {
    let readme = ws.add_project("alpha", "# Alpha\n");
    ws.set_mtime(&readme, 0.0);
    let (clock, engine) = engine(ws);
    engine.sync_all().unwrap();
    past_cooldown(&clock);
    (clock, engine)
}

mod forward {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_sync_builds_a_flat_mirror() {
        let ws = TestWorkspace::new();
        ws.add_project("alpha", "# Alpha\n");
        ws.add_project("beta", "# Beta\n");
        let (_, engine) = engine(&ws);

        let report = engine.sync_all().unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.synced, 2);
        assert_eq!(ws.target_files(), vec!["alpha-README.md", "beta-README.md"]);
        assert_eq!(ws.read(&ws.target_path("beta-README.md")), "# Beta\n");
        assert_eq!(engine.mappings().unwrap().len(), 2);
    }

    #[test]
    fn generic_subfolder_takes_the_project_name() {
        let ws = TestWorkspace::new();
        ws.write_source("gamma/docs/README.md", "# Gamma docs\n");
        let (_, engine) = engine(&ws);

        engine.sync_all().unwrap();

        assert_eq!(ws.target_files(), vec!["gamma-README.md"]);
    }

    #[test]
    fn excluded_directories_are_not_scanned() {
        let ws = TestWorkspace::new();
        ws.add_project("alpha", "# Alpha\n");
        ws.write_source("alpha/node_modules/dep/README.md", "# dep\n");
        let (_, engine) = engine(&ws);

        let report = engine.sync_all().unwrap();

        assert_eq!(report.scanned, 1);
        assert_eq!(ws.target_files(), vec!["alpha-README.md"]);
    }

    #[test]
    fn duplicate_identity_keeps_first_source_and_reports_the_rest() {
        let ws = TestWorkspace::new();
        ws.write_source("a/tool/README.md", "first\n");
        ws.write_source("b/tool/README.md", "second\n");
        let (_, engine) = engine(&ws);

        let report = engine.sync_all().unwrap();

        assert_eq!(report.ambiguous, 1);
        assert_eq!(report.synced, 1);
        assert_eq!(ws.read(&ws.target_path("tool-README.md")), "first\n");
        let scan = engine.scan();
        assert_eq!(scan.ambiguities.len(), 1);
        assert!(scan.ambiguities[0].skipped[0].as_str().ends_with("b/tool/README.md"));
    }

    #[test]
    fn case_style_lowers_mirror_names() {
        let ws = TestWorkspace::new();
        ws.add_project("Alpha", "# Alpha\n");
        let (_, engine) = engine_with(&ws, |s| s.naming_rules.case_style = CaseStyle::Lower);

        engine.sync_all().unwrap();

        assert_eq!(ws.target_files(), vec!["alpha-readme.md"]);
    }

    #[test]
    fn existing_mirror_in_a_subfolder_is_reused() {
        let ws = TestWorkspace::new();
        let readme = ws.add_project("alpha", "# Alpha v2\n");
        ws.set_mtime(&readme, 100.0);
        let placed = ws.write_target("projects/alpha-README.md", "# Alpha v1\n");
        ws.set_mtime(&placed, 0.0);
        let (_, engine) = engine(&ws);

        engine.sync_all().unwrap();

        assert_eq!(ws.target_files(), vec!["projects/alpha-README.md"]);
        assert_eq!(ws.read(&placed), "# Alpha v2\n");
    }

    #[test]
    fn cooldown_skips_an_immediate_repeat() {
        let ws = TestWorkspace::new();
        ws.add_project("alpha", "# Alpha\n");
        let (clock, engine) = engine(&ws);
        let candidate = engine.scan().candidates.remove(0);

        assert_eq!(engine.sync_file(&candidate), FileOutcome::Synced);
        assert_eq!(engine.sync_file(&candidate), FileOutcome::Skipped);
        past_cooldown(&clock);
        assert_eq!(engine.sync_file(&candidate), FileOutcome::NoChange);
    }

    #[test]
    fn one_failing_file_does_not_stop_the_batch() {
        let ws = TestWorkspace::new();
        ws.add_project("alpha", "# Alpha\n");
        ws.add_project("beta", "# Beta\n");
        fs::create_dir_all(ws.target_path("alpha-README.md")).unwrap();
        let (_, engine) = engine(&ws);

        let report = engine.sync_all().unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.errors, 1);
        assert_eq!(report.synced, 1);
        assert_eq!(ws.read(&ws.target_path("beta-README.md")), "# Beta\n");
    }

    #[test]
    fn matching_edits_on_both_sides_refresh_the_baseline() {
        let ws = TestWorkspace::new();
        let (_, engine) = synced_alpha(&ws);
        ws.edit(&ws.source_root().join("alpha/README.md"), "# Alpha v2\n", 10.0);
        ws.edit(&ws.target_path("alpha-README.md"), "# Alpha v2\n", 30.0);
        assert_eq!(engine.get_status().unwrap().outdated_files, 1);

        let report = engine.sync_all().unwrap();

        assert_eq!(report.actions(), 0);
        assert_eq!(engine.get_status().unwrap().outdated_files, 0);
        let mapping = engine.mappings().unwrap().remove(0);
        assert!(mapping.source_hash.is_some());
        assert_eq!(mapping.source_hash, mapping.target_hash);
    }

    #[test]
    fn invalid_configuration_aborts_before_touching_files() {
        let ws = TestWorkspace::new();
        ws.add_project("alpha", "# Alpha\n");
        let (_, engine) = engine_with(&ws, |s| s.target_folder = None);

        let err = engine.sync_all().unwrap_err();

        assert!(matches!(err, Error::ConfigInvalid { .. }), "got {err:?}");
        assert!(ws.target_files().is_empty());
    }
}

mod renames {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn naming_change_renames_the_mirror() {
        let ws = TestWorkspace::new();
        synced_alpha(&ws);

        let (_, engine) = engine_with(&ws, |s| s.naming_rules.pattern = "{project_name}_notes".into());
        engine.sync_all().unwrap();

        assert_eq!(ws.target_files(), vec!["alpha_notes.md"]);
        assert_eq!(ws.read(&ws.target_path("alpha_notes.md")), "# Alpha\n");
    }

    #[test]
    fn empty_source_gets_a_fresh_mirror_instead_of_a_move() {
        let ws = TestWorkspace::new();
        ws.add_project("alpha", "");
        let (_, engine) = engine(&ws);
        engine.sync_all().unwrap();

        let (_, engine) = engine_with(&ws, |s| s.naming_rules.pattern = "{project_name}_notes".into());
        engine.sync_all().unwrap();

        assert_eq!(ws.target_files(), vec!["alpha_notes.md", "unlinked/alpha-README.md"]);
    }
}

mod reverse {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reverse_pass_without_force_respects_a_newer_source() {
        let ws = TestWorkspace::new();
        let (_, engine) = synced_alpha(&ws);
        let source = ws.source_root().join("alpha/README.md");
        let target = ws.target_path("alpha-README.md");
        ws.edit(&source, "source edit\n", 100.0);
        ws.edit(&target, "mirror edit\n", 50.0);

        let report = engine.reverse_sync_from_target(false).unwrap();
        assert_eq!(report.scanned, 1);
        assert_eq!(report.synced, 0);
        assert_eq!(ws.read(&source), "source edit\n");

        let forced = engine.reverse_sync_from_target(true).unwrap();
        assert_eq!(forced.synced, 1);
        assert_eq!(ws.read(&source), "mirror edit\n");
    }

    #[test]
    fn deleted_source_is_never_recreated_from_the_mirror() {
        let ws = TestWorkspace::new();
        let (_, engine) = synced_alpha(&ws);
        let source = ws.source_root().join("alpha/README.md");
        let target = ws.target_path("alpha-README.md");
        ws.edit(&target, "mirror edit\n", 100.0);
        fs::remove_file(&source).unwrap();

        let report = engine.reverse_sync_from_target(true).unwrap();
        assert_eq!(report.synced, 0);

        let err = engine
            .force_sync_target_to_source(&NormalizedPath::new(&target))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
        assert!(!source.exists());
        assert_eq!(ws.read(&target), "mirror edit\n");
    }

    #[test]
    fn untracked_mirror_with_no_matching_source_counts_as_no_mapping() {
        let ws = TestWorkspace::new();
        let (_, engine) = synced_alpha(&ws);
        ws.write_target("notes.md", "scratch\n");

        let report = engine.reverse_sync_from_target(false).unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.no_mapping, 1);
    }

    #[test]
    fn mirror_found_by_filename_is_adopted() {
        let ws = TestWorkspace::new();
        let (_, engine) = synced_alpha(&ws);
        let old = ws.target_path("alpha-README.md");
        let moved = ws.target_path("archive/alpha-README.md");
        fs::create_dir_all(moved.parent().unwrap()).unwrap();
        fs::rename(&old, &moved).unwrap();
        ws.edit(&moved, "edited after the move\n", 100.0);

        let report = engine.reverse_sync_from_target(false).unwrap();

        assert_eq!(report.synced, 1);
        assert_eq!(ws.read(&ws.source_root().join("alpha/README.md")), "edited after the move\n");
        let mapping = engine.mappings().unwrap().remove(0);
        assert_eq!(mapping.target_path, NormalizedPath::new(&moved));
    }
}

mod conflicts {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn dual_edits_are_listed_with_the_newer_side() {
        let ws = TestWorkspace::new();
        let (_, engine) = synced_alpha(&ws);
        ws.edit(&ws.source_root().join("alpha/README.md"), "S\n", 10.0);
        ws.edit(&ws.target_path("alpha-README.md"), "T\n", 30.0);

        let conflicts = engine.get_conflicts().unwrap();

        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].target_newer);
        assert!(!conflicts[0].source_newer);
    }

    #[test]
    fn single_side_edit_is_not_a_conflict() {
        let ws = TestWorkspace::new();
        let (_, engine) = synced_alpha(&ws);
        ws.edit(&ws.target_path("alpha-README.md"), "T\n", 30.0);

        assert!(engine.get_conflicts().unwrap().is_empty());
    }

    #[test]
    fn default_tie_break_lets_a_clearly_newer_source_win() {
        let ws = TestWorkspace::new();
        let (_, engine) = synced_alpha(&ws);
        ws.edit(&ws.source_root().join("alpha/README.md"), "S\n", 60.0);
        ws.edit(&ws.target_path("alpha-README.md"), "T\n", 10.0);

        let report = engine.sync_all().unwrap();

        assert_eq!(report.synced, 1);
        assert_eq!(ws.read(&ws.target_path("alpha-README.md")), "S\n");
    }

    #[test]
    fn strict_tie_break_with_manual_policy_leaves_both_sides() {
        let ws = TestWorkspace::new();
        ws.add_project("alpha", "# Alpha\n");
        ws.set_mtime(&ws.source_root().join("alpha/README.md"), 0.0);
        let (clock, engine) = engine_with(&ws, |s| {
            s.sync_settings.conflict_resolution = ConflictPolicy::Manual;
            s.sync_settings.tie_break.source_newer = SourceNewerAction::Conflict;
        });
        engine.sync_all().unwrap();
        past_cooldown(&clock);
        ws.edit(&ws.source_root().join("alpha/README.md"), "S\n", 60.0);
        ws.edit(&ws.target_path("alpha-README.md"), "T\n", 10.0);

        let report = engine.sync_all().unwrap();

        assert_eq!(report.conflicts, 1);
        assert_eq!(report.synced, 0);
        assert_eq!(ws.read(&ws.target_path("alpha-README.md")), "T\n");
        assert_eq!(ws.read(&ws.source_root().join("alpha/README.md")), "S\n");
    }

    #[test]
    fn force_resolve_keeps_the_chosen_side() {
        let ws = TestWorkspace::new();
        let (_, engine) = synced_alpha(&ws);
        ws.edit(&ws.source_root().join("alpha/README.md"), "S\n", 10.0);
        ws.edit(&ws.target_path("alpha-README.md"), "T\n", 30.0);
        let target = NormalizedPath::new(ws.target_path("alpha-README.md"));

        engine.force_resolve(&target, Side::Target).unwrap();

        assert_eq!(ws.read(&ws.source_root().join("alpha/README.md")), "T\n");
        assert!(engine.get_conflicts().unwrap().is_empty());
    }

    #[test]
    fn force_resolve_on_unknown_mirror_is_not_found() {
        let ws = TestWorkspace::new();
        let (_, engine) = synced_alpha(&ws);
        let stray = ws.write_target("stray.md", "nobody owns me\n");

        let err = engine
            .force_resolve(&NormalizedPath::new(stray), Side::Source)
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
    }
}

mod inspection {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn status_counts_drift_and_missing_sides() {
        let ws = TestWorkspace::new();
        ws.add_project("beta", "# Beta\n");
        let (_, engine) = synced_alpha(&ws);
        ws.edit(&ws.source_root().join("alpha/README.md"), "changed\n", 10.0);
        fs::remove_file(ws.target_path("beta-README.md")).unwrap();

        let status = engine.get_status().unwrap();

        assert_eq!(status.total_mappings, 2);
        assert_eq!(status.source_files, 2);
        assert_eq!(status.target_files, 1);
        assert_eq!(status.source_folders, 1);
        assert_eq!(status.outdated_files, 1);
        assert_eq!(status.missing_target, 1);
        assert_eq!(status.missing_source, 0);
        assert!(status.last_sync_time.is_some());
    }

    #[test]
    fn plan_reports_verdicts_without_touching_files() {
        let ws = TestWorkspace::new();
        ws.add_project("alpha", "# Alpha\n");
        let (_, engine) = engine(&ws);

        let plan = engine.plan().unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].verdict, Verdict::SourceToTarget);
        assert_eq!(plan[0].rule, "target-missing");
        assert!(ws.target_files().is_empty());
        assert!(engine.mappings().unwrap().is_empty());
    }
}

mod unlinked {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn untracked_mirror_files_are_quarantined() {
        let ws = TestWorkspace::new();
        ws.add_project("alpha", "# Alpha\n");
        ws.write_target("stray.md", "left over\n");
        let (_, engine) = engine(&ws);

        let report = engine.sync_all().unwrap();

        assert_eq!(report.unlinked_moved, 1);
        assert_eq!(ws.target_files(), vec!["alpha-README.md", "unlinked/stray.md"]);
        assert_eq!(ws.read(&ws.target_path("unlinked/stray.md")), "left over\n");
    }

    #[test]
    fn quarantine_never_overwrites() {
        let ws = TestWorkspace::new();
        ws.add_project("alpha", "# Alpha\n");
        ws.write_target("unlinked/stray.md", "older\n");
        ws.write_target("stray.md", "newer\n");
        let (_, engine) = engine(&ws);

        engine.sync_all().unwrap();

        let quarantined: Vec<_> = ws
            .target_files()
            .into_iter()
            .filter(|f| f.starts_with("unlinked/stray"))
            .collect();
        assert_eq!(quarantined.len(), 2);
        assert_eq!(ws.read(&ws.target_path("unlinked/stray.md")), "older\n");
    }

    #[test]
    fn quarantine_can_be_disabled() {
        let ws = TestWorkspace::new();
        ws.add_project("alpha", "# Alpha\n");
        ws.write_target("stray.md", "left over\n");
        let (_, engine) = engine_with(&ws, |s| s.sync_settings.move_unlinked_files = false);

        let report = engine.sync_all().unwrap();

        assert_eq!(report.unlinked_moved, 0);
        assert_eq!(
            engine.find_unlinked().unwrap(),
            vec![NormalizedPath::new(ws.target_path("stray.md"))]
        );
    }
}
