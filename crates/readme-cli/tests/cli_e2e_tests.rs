//! CLI end-to-end tests that invoke the compiled `readme-sync` binary
//! against a temporary workspace.

use assert_cmd::Command;
use predicates::prelude::*;
use readme_test_utils::TestWorkspace;

/// `readme-sync --config <workspace config>` with a clean environment.
fn readme_sync(ws: &TestWorkspace) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("readme-sync"));
    cmd.arg("--config")
        .arg(ws.config_file())
        .env_remove("README_SYNC_CONFIG")
        .env_remove("README_SYNC_HOME")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

/// Workspace with project `alpha` at offset 0 and a written config.
fn configured() -> TestWorkspace {
    let ws = TestWorkspace::new();
    let readme = ws.add_project("alpha", "# Alpha\n");
    ws.set_mtime(&readme, 0.0);
    ws.write_config("");
    ws
}

#[test]
fn no_command_prints_hint() {
    let ws = TestWorkspace::new();
    readme_sync(&ws)
        .assert()
        .success()
        .stdout(predicate::str::contains("readme-sync --help"));
}

#[test]
fn init_then_sync_builds_the_mirror() {
    let ws = TestWorkspace::new();
    ws.add_project("alpha", "# Alpha\n");

    readme_sync(&ws)
        .arg("init")
        .arg("--target")
        .arg(ws.target_root())
        .arg("--source")
        .arg(ws.source_root())
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written"));
    assert!(ws.config_file().exists());

    readme_sync(&ws)
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sync complete"));

    ws.assert_target_exists("alpha-README.md");
    assert_eq!(ws.read(&ws.target_path("alpha-README.md")), "# Alpha\n");
}

#[test]
fn sync_without_target_fails() {
    let ws = TestWorkspace::new();
    readme_sync(&ws)
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("target folder is not set"));
}

#[test]
fn sync_json_reports_counts() {
    let ws = configured();
    ws.add_project("beta", "# Beta\n");

    let report = json_output(readme_sync(&ws).args(["sync", "--json"]));

    assert_eq!(report["scanned"], 2);
    assert_eq!(report["synced"], 2);
    assert_eq!(report["conflicts"], 0);
}

#[test]
fn dry_run_touches_nothing() {
    let ws = configured();

    let plan = json_output(readme_sync(&ws).args(["sync", "--dry-run", "--json"]));

    assert_eq!(plan[0]["verdict"], "source_to_target");
    assert!(plan[0]["target_path"].as_str().unwrap().ends_with("alpha-README.md"));
    assert!(ws.target_files().is_empty());
}

#[test]
fn reverse_sync_copies_newer_mirror_back() {
    let ws = configured();
    readme_sync(&ws).arg("sync").assert().success();
    ws.edit(&ws.target_path("alpha-README.md"), "# Alpha, edited in the mirror\n", 100.0);

    readme_sync(&ws)
        .args(["sync", "--reverse", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reverse sync complete"));

    assert_eq!(
        ws.read(&ws.source_root().join("alpha/README.md")),
        "# Alpha, edited in the mirror\n"
    );
}

#[test]
fn forced_reverse_overwrites_newer_source() {
    let ws = configured();
    readme_sync(&ws).arg("sync").assert().success();
    ws.edit(&ws.target_path("alpha-README.md"), "mirror\n", 10.0);
    ws.edit(&ws.source_root().join("alpha/README.md"), "source\n", 50.0);

    let report = json_output(readme_sync(&ws).args(["sync", "--reverse", "--force", "--json"]));

    assert_eq!(report["synced"], 1);
    assert_eq!(ws.read(&ws.source_root().join("alpha/README.md")), "mirror\n");
}

#[test]
fn status_json_lists_folders() {
    let ws = configured();
    readme_sync(&ws).arg("sync").assert().success();

    let status = json_output(readme_sync(&ws).args(["status", "--json"]));

    assert_eq!(status["total_mappings"], 1);
    assert_eq!(status["target_files"], 1);
    assert_eq!(status["outdated_files"], 0);
    assert_eq!(status["sources"][0]["exists"], true);
    assert_eq!(status["target"]["exists"], true);
}

#[test]
fn mappings_json_after_sync() {
    let ws = configured();
    readme_sync(&ws).arg("sync").assert().success();

    let mappings = json_output(readme_sync(&ws).args(["mappings", "--json"]));

    assert_eq!(mappings.as_array().unwrap().len(), 1);
    assert_eq!(mappings[0]["logical_name"], "alpha");
    assert_eq!(mappings[0]["canonical_filename"], "alpha-README.md");
}

#[test]
fn scan_flags_ambiguous_identities() {
    let ws = configured();
    ws.write_source("one/tool/README.md", "first\n");
    ws.write_source("two/tool/README.md", "second\n");

    readme_sync(&ws)
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha-README.md"))
        .stdout(predicate::str::contains("ambiguous"));
}

#[test]
fn manual_conflict_is_listed_diffed_and_resolved() {
    let ws = configured();
    readme_sync(&ws)
        .args(["config", "set", "sync_settings.conflict_resolution", "manual"])
        .assert()
        .success();
    readme_sync(&ws).arg("sync").assert().success();

    let mirror = ws.target_path("alpha-README.md");
    let source = ws.source_root().join("alpha/README.md");
    ws.edit(&source, "# Alpha\nsource line\n", 20.0);
    ws.edit(&mirror, "# Alpha\nmirror line\n", 40.0);

    let conflicts = json_output(readme_sync(&ws).args(["conflicts", "list", "--json"]));
    assert_eq!(conflicts.as_array().unwrap().len(), 1);
    assert_eq!(conflicts[0]["target_newer"], true);

    readme_sync(&ws)
        .args(["conflicts", "diff"])
        .arg(&mirror)
        .assert()
        .success()
        .stdout(predicate::str::contains("-source line"))
        .stdout(predicate::str::contains("+mirror line"));

    readme_sync(&ws)
        .args(["conflicts", "resolve"])
        .arg(&mirror)
        .args(["--keep", "source"])
        .assert()
        .success();

    assert_eq!(ws.read(&mirror), "# Alpha\nsource line\n");
    let conflicts = json_output(readme_sync(&ws).args(["conflicts", "list", "--json"]));
    assert!(conflicts.as_array().unwrap().is_empty());
}

#[test]
fn unlinked_files_are_listed_then_quarantined() {
    let ws = configured();
    readme_sync(&ws).arg("sync").assert().success();
    ws.write_target("stray.md", "# Nobody's\n");

    readme_sync(&ws)
        .args(["unlinked", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stray.md"));

    readme_sync(&ws).args(["unlinked", "move"]).assert().success();

    assert_eq!(ws.target_files(), vec!["alpha-README.md", "unlinked/stray.md"]);
}

#[test]
fn cleanup_drops_mappings_of_removed_sources() {
    let ws = configured();
    readme_sync(&ws).arg("sync").assert().success();
    std::fs::remove_file(ws.source_root().join("alpha/README.md")).unwrap();

    readme_sync(&ws)
        .arg("cleanup")
        .assert()
        .success()
        .stdout(predicate::str::contains("orphaned mappings"));

    let mappings = json_output(readme_sync(&ws).args(["mappings", "--json"]));
    assert!(mappings.as_array().unwrap().is_empty());
}

#[test]
fn config_get_and_set_round_trip() {
    let ws = configured();

    readme_sync(&ws)
        .args(["config", "set", "sync_settings.tolerance_seconds", "7.5"])
        .assert()
        .success();
    readme_sync(&ws)
        .args(["config", "get", "sync_settings.tolerance_seconds"])
        .assert()
        .success()
        .stdout(predicate::str::contains("7.5"));
}

#[test]
fn config_set_rejects_invalid_values() {
    let ws = configured();
    readme_sync(&ws)
        .args(["config", "set", "sync_settings.cleanup_interval", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cleanup_interval"));
}

#[test]
fn disabled_source_is_not_scanned() {
    let ws = configured();
    let extra = ws.add_source_root("extra");
    std::fs::create_dir_all(extra.join("delta")).unwrap();
    std::fs::write(extra.join("delta/README.md"), "# Delta\n").unwrap();

    readme_sync(&ws).arg("add-source").arg(&extra).assert().success();
    readme_sync(&ws).arg("disable-source").arg(&extra).assert().success();
    readme_sync(&ws).arg("sync").assert().success();
    assert_eq!(ws.target_files(), vec!["alpha-README.md"]);

    readme_sync(&ws).arg("enable-source").arg(&extra).assert().success();
    readme_sync(&ws).arg("sync").assert().success();
    assert_eq!(ws.target_files(), vec!["alpha-README.md", "delta-README.md"]);
}

#[test]
fn completions_need_no_config() {
    let ws = TestWorkspace::new();
    readme_sync(&ws)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("readme-sync"));
    assert!(!ws.config_file().exists());
}
