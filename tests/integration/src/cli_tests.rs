//! CLI end-to-end tests
//!
//! Drives the `overlay` binary against scratch projects.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn overlay(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("overlay").unwrap();
    cmd.current_dir(root);
    cmd
}

fn setup_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    fs::create_dir_all(root.join(".overlay")).unwrap();
    fs::create_dir_all(root.join("layers")).unwrap();

    fs::write(
        root.join(".overlay/config.toml"),
        r#"
[[settings]]
target = "settings.json"

[[settings.layer]]
source = "base"
precedence = 0
path = "layers/base.json"

[[settings.layer]]
source = "python"
precedence = 10
path = "layers/python.json"
when = ["python"]

[settings.strategy]
enabledPlugins = "deep-merge"
"#,
    )
    .unwrap();
    fs::write(
        root.join("layers/base.json"),
        json!({"enabledPlugins": {"core": true}}).to_string(),
    )
    .unwrap();
    fs::write(
        root.join("layers/python.json"),
        json!({"enabledPlugins": {"python": true}}).to_string(),
    )
    .unwrap();

    temp
}

#[test]
fn init_scaffolds_a_manifest() {
    let temp = TempDir::new().unwrap();

    overlay(temp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    assert!(temp.path().join(".overlay/config.toml").exists());

    // Running again refuses
    overlay(temp.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn sync_writes_composed_settings() {
    let temp = setup_project();

    overlay(temp.path())
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sync complete"));

    let settings = fs::read_to_string(temp.path().join("settings.json")).unwrap();
    assert!(settings.contains("\"core\": true"));
    assert!(!settings.contains("python"));
}

#[test]
fn sync_with_tag_activates_conditional_layer() {
    let temp = setup_project();

    overlay(temp.path())
        .args(["sync", "--tag", "python"])
        .assert()
        .success();

    let settings = fs::read_to_string(temp.path().join("settings.json")).unwrap();
    assert!(settings.contains("\"python\": true"));
}

#[test]
fn dry_run_previews_without_writing() {
    let temp = setup_project();

    overlay(temp.path())
        .args(["sync", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[dry-run]"));

    assert!(!temp.path().join("settings.json").exists());
}

#[test]
fn status_reports_json() {
    let temp = setup_project();
    overlay(temp.path()).arg("sync").assert().success();

    let output = overlay(temp.path())
        .args(["status", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(parsed[0]["state"], "clean");
}

#[test]
fn status_flags_external_edits() {
    let temp = setup_project();
    overlay(temp.path()).arg("sync").assert().success();

    fs::write(temp.path().join("settings.json"), "{\"edited\": true}").unwrap();

    overlay(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("drifted"));
}

#[test]
fn diff_shows_pending_changes() {
    let temp = setup_project();

    overlay(temp.path())
        .arg("diff")
        .assert()
        .success()
        .stdout(predicate::str::contains("settings.json"))
        .stdout(predicate::str::contains("+"));

    overlay(temp.path()).arg("sync").assert().success();

    overlay(temp.path())
        .arg("diff")
        .assert()
        .success()
        .stdout(predicate::str::contains("Everything up to date"));
}

#[test]
fn restore_rolls_back_an_edit() {
    let temp = setup_project();
    overlay(temp.path()).arg("sync").assert().success();
    let composed = fs::read_to_string(temp.path().join("settings.json")).unwrap();

    // External edit, then re-sync (which backs up the edit), then restore it
    fs::write(temp.path().join("settings.json"), "{\"edited\": true}").unwrap();
    overlay(temp.path()).arg("sync").assert().success();

    overlay(temp.path())
        .args(["restore", "settings.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored"));

    assert_eq!(
        fs::read_to_string(temp.path().join("settings.json")).unwrap(),
        "{\"edited\": true}"
    );

    // The pre-restore state was itself backed up, so restoring again
    // returns to the composed content
    overlay(temp.path())
        .args(["restore", "settings.json"])
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(temp.path().join("settings.json")).unwrap(),
        composed
    );
}

#[test]
fn restore_list_shows_snapshots() {
    let temp = setup_project();
    overlay(temp.path()).arg("sync").assert().success();

    overlay(temp.path())
        .args(["restore", "settings.json", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("file did not exist"));
}

#[test]
fn restore_unknown_target_fails() {
    let temp = setup_project();

    overlay(temp.path())
        .args(["restore", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not declared"));
}

#[test]
fn prune_limits_snapshots() {
    let temp = setup_project();
    overlay(temp.path()).arg("sync").assert().success();
    for i in 0..3 {
        fs::write(
            temp.path().join("settings.json"),
            format!("{{\"edit\": {i}}}"),
        )
        .unwrap();
        overlay(temp.path()).arg("sync").assert().success();
    }

    overlay(temp.path())
        .args(["prune", "--keep", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pruned"));
}

#[test]
fn missing_manifest_is_a_clean_error() {
    let temp = TempDir::new().unwrap();

    overlay(temp.path())
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}
