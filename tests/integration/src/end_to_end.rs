//! End-to-end tests for the full mutation pipeline
//!
//! These exercise the complete flow across crates: manifest loading ->
//! composition -> atomic apply -> drift detection -> rollback.

use std::fs;
use std::path::Path;

use overlay_core::{DriftState, SyncOptions, Syncer};
use overlay_fs::BackupSelector;
use serde_json::{Value, json};
use tempfile::TempDir;

fn setup_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    fs::create_dir_all(root.join(".overlay")).unwrap();
    fs::create_dir_all(root.join("layers")).unwrap();
    fs::create_dir_all(root.join("sections")).unwrap();

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
source = "team"
precedence = 5
path = "layers/team.json"

[settings.strategy]
"permissions.allow" = "union"
enabledPlugins = "deep-merge"
hooks = { strategy = "deep-merge", group-by = "matcher", dedup-by = "command" }
feedbackSurveyState = "preserved"

[[document]]
target = "ASSISTANT.md"

[[document.section]]
name = "workflow"
version = "1.0.0"
source = "sections/workflow.md"
"#,
    )
    .unwrap();

    fs::write(
        root.join("layers/base.json"),
        json!({
            "enabledPlugins": {"core": true},
            "permissions": {"allow": ["Read", "Grep"]},
            "hooks": {
                "PreToolUse": [
                    {"matcher": "Bash", "hooks": [{"type": "command", "command": "lint.sh"}]}
                ]
            }
        })
        .to_string(),
    )
    .unwrap();
    fs::write(
        root.join("layers/team.json"),
        json!({
            "enabledPlugins": {"review": true},
            "permissions": {"allow": ["Grep", "Bash(git *)"]},
            "hooks": {
                "PreToolUse": [
                    {"matcher": "Bash", "hooks": [
                        {"type": "command", "command": "lint.sh"},
                        {"type": "command", "command": "secrets-scan.sh"}
                    ]}
                ]
            }
        })
        .to_string(),
    )
    .unwrap();
    fs::write(
        root.join("sections/workflow.md"),
        "Always run the formatter before committing.\n",
    )
    .unwrap();

    temp
}

fn read_settings(root: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(root.join("settings.json")).unwrap()).unwrap()
}

#[test]
fn full_lifecycle_compose_drift_restore() {
    let temp = setup_project();
    let root = temp.path();
    let syncer = Syncer::load(root).unwrap();

    // 1. First sync writes both targets
    let report = syncer.sync(&SyncOptions::default()).unwrap();
    assert!(report.success, "errors: {:?}", report.errors);

    let settings = read_settings(root);
    assert_eq!(
        settings["enabledPlugins"],
        json!({"core": true, "review": true})
    );
    assert_eq!(
        settings["permissions"]["allow"],
        json!(["Read", "Grep", "Bash(git *)"])
    );
    let pre_hooks = settings["hooks"]["PreToolUse"].as_array().unwrap();
    assert_eq!(pre_hooks.len(), 1, "Bash matcher groups merge");
    assert_eq!(
        pre_hooks[0]["hooks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| h["command"].as_str().unwrap())
            .collect::<Vec<_>>(),
        vec!["lint.sh", "secrets-scan.sh"]
    );

    // 2. Everything is clean and a second sync changes nothing
    for (_, state) in syncer.status().unwrap() {
        assert_eq!(state, DriftState::Clean);
    }
    let settings_bytes = fs::read(root.join("settings.json")).unwrap();
    syncer.sync(&SyncOptions::default()).unwrap();
    assert_eq!(fs::read(root.join("settings.json")).unwrap(), settings_bytes);

    // 3. An external edit shows as drift
    let mut edited = read_settings(root);
    edited["permissions"]["allow"] = json!(["EverythingGoes"]);
    fs::write(
        root.join("settings.json"),
        serde_json::to_string_pretty(&edited).unwrap(),
    )
    .unwrap();

    let settings_state = syncer
        .status()
        .unwrap()
        .into_iter()
        .find(|(p, _)| p.ends_with("settings.json"))
        .map(|(_, s)| s)
        .unwrap();
    assert!(matches!(settings_state, DriftState::Drifted { .. }));

    // 4. Re-syncing repairs the drift (composition overrides the edit)
    syncer.sync(&SyncOptions::default()).unwrap();
    assert_eq!(
        read_settings(root)["permissions"]["allow"],
        json!(["Read", "Grep", "Bash(git *)"])
    );

    // 5. Rollback to the drifted bytes captured in the pre-sync backup
    let engine = syncer.engine();
    engine
        .restore(&root.join("settings.json"), &BackupSelector::Latest)
        .unwrap();
    assert_eq!(
        read_settings(root)["permissions"]["allow"],
        json!(["EverythingGoes"])
    );
    // Restore rebases the drift record, so the restored state is clean
    assert_eq!(
        engine.status(&root.join("settings.json")).unwrap(),
        DriftState::Clean
    );
}

#[test]
fn preserved_runtime_state_round_trips_through_syncs() {
    let temp = setup_project();
    let root = temp.path();
    let syncer = Syncer::load(root).unwrap();

    syncer.sync(&SyncOptions::default()).unwrap();

    let mut settings = read_settings(root);
    settings["feedbackSurveyState"] = json!({"lastShownTime": 1754000000});
    fs::write(
        root.join("settings.json"),
        serde_json::to_string_pretty(&settings).unwrap(),
    )
    .unwrap();

    // Two consecutive syncs: the state key must survive both
    syncer.sync(&SyncOptions::default()).unwrap();
    syncer.sync(&SyncOptions::default()).unwrap();

    assert_eq!(
        read_settings(root)["feedbackSurveyState"],
        json!({"lastShownTime": 1754000000})
    );
}

#[test]
fn document_sections_and_user_content_coexist() {
    let temp = setup_project();
    let root = temp.path();

    fs::write(
        root.join("ASSISTANT.md"),
        "# Project notes\n<!-- overlay:user -->\nKeep my hand-written part.\n",
    )
    .unwrap();

    let syncer = Syncer::load(root).unwrap();
    syncer.sync(&SyncOptions::default()).unwrap();

    let doc = fs::read_to_string(root.join("ASSISTANT.md")).unwrap();
    assert!(doc.starts_with("# Project notes\n"));
    assert!(doc.contains("<!-- overlay:begin:workflow v1.0.0 -->"));
    assert!(doc.ends_with("<!-- overlay:user -->\nKeep my hand-written part.\n"));

    // Bump the section version; user content still untouched
    let manifest = fs::read_to_string(root.join(".overlay/config.toml"))
        .unwrap()
        .replace("version = \"1.0.0\"", "version = \"2.0.0\"");
    fs::write(root.join(".overlay/config.toml"), manifest).unwrap();
    fs::write(root.join("sections/workflow.md"), "New workflow.\n").unwrap();

    let syncer = Syncer::load(root).unwrap();
    syncer.sync(&SyncOptions::default()).unwrap();

    let doc = fs::read_to_string(root.join("ASSISTANT.md")).unwrap();
    assert!(doc.contains("<!-- overlay:begin:workflow v2.0.0 -->"));
    assert!(doc.contains("New workflow.\n"));
    assert!(doc.ends_with("<!-- overlay:user -->\nKeep my hand-written part.\n"));
}

#[test]
fn prune_keeps_backup_history_bounded() {
    let temp = setup_project();
    let root = temp.path();
    let syncer = Syncer::load(root).unwrap();

    // Generate several generations of backups by editing and re-syncing
    syncer.sync(&SyncOptions::default()).unwrap();
    for i in 0..4 {
        fs::write(root.join("settings.json"), format!("{{\"edit\": {i}}}")).unwrap();
        syncer.sync(&SyncOptions::default()).unwrap();
    }

    let target = root.join("settings.json");
    let backups = syncer.engine().backups();
    assert!(backups.list(&target).unwrap().len() >= 5);

    syncer.engine().prune(&target, 2).unwrap();
    assert_eq!(backups.list(&target).unwrap().len(), 2);
}
