//! CLI behaviour that needs no network or external engine.

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn upgrader() -> Command {
    let mut cmd = Command::cargo_bin("upgrader").expect("upgrader binary");
    cmd.env_remove("RUST_LOG");
    cmd
}

const MANIFEST: &str = r#"{
  "name": "demo-app",
  "dependencies": {
    "@acme/core": "1.1.0"
  }
}
"#;

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// App pinned to 1.1.0 with a document codemod at 1.2.0 and a code codemod
/// at 2.0.0.
fn create_temp_project() -> TempDir {
    let td = tempfile::tempdir().expect("tempdir");
    let root = td.path();

    write(&root.join("package.json"), MANIFEST);
    write(&root.join("src/index.ts"), "export {};\n");
    write(
        &root.join("codemods/1.2.0/mark-private.document.json"),
        r#"[{"op": "add", "path": "/private", "value": true}]"#,
    );
    write(&root.join("codemods/2.0.0/rename-entry-point.code.ts"), "");

    td
}

#[test]
fn test_help_lists_commands() {
    upgrader()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("upgrade"))
        .stdout(predicate::str::contains("codemods"));
}

#[test]
fn test_upgrade_rejects_bad_target() {
    let temp = create_temp_project();

    upgrader()
        .current_dir(temp.path())
        .args(["upgrade", "not-a-version", "--framework", "@acme/core"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid version"));
}

#[test]
fn test_upgrade_to_installed_version_fails() {
    let temp = create_temp_project();

    upgrader()
        .current_dir(temp.path())
        .args([
            "upgrade",
            "1.1.0",
            "--framework",
            "@acme/core",
            "--registry",
            "http://127.0.0.1:9",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("already up to date: @acme/core is at 1.1.0"));

    let manifest = fs::read_to_string(temp.path().join("package.json")).unwrap();
    assert_eq!(manifest, MANIFEST);
}

#[test]
fn test_debug_and_silent_conflict() {
    upgrader()
        .args(["--debug", "--silent", "codemods", "list"])
        .assert()
        .failure();
}

#[test]
fn test_range_and_uid_conflict() {
    let temp = create_temp_project();

    upgrader()
        .current_dir(temp.path())
        .args(["codemods", "run", "--range", ">1.0.0", "--uid", "x"])
        .assert()
        .failure();
}

#[test]
fn test_list_text_shows_titles_and_uids() {
    let temp = create_temp_project();

    upgrader()
        .current_dir(temp.path())
        .args(["codemods", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mark Private"))
        .stdout(predicate::str::contains("2.0.0-rename-entry-point-code"));
}

#[test]
fn test_list_json_filters_by_range() {
    let temp = create_temp_project();

    let output = upgrader()
        .current_dir(temp.path())
        .args(["codemods", "list", "--format", "json", "--range", ">=2.0.0"])
        .output()
        .expect("run upgrader");
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let versions: Vec<&str> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["version"].as_str().unwrap())
        .collect();
    assert_eq!(versions, vec!["2.0.0"]);
}

#[test]
fn test_list_fails_without_codemods_dir() {
    let temp = tempfile::tempdir().unwrap();

    upgrader()
        .current_dir(temp.path())
        .args(["codemods", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid codemods repository"));
}

#[test]
fn test_run_requires_framework() {
    let temp = create_temp_project();

    upgrader()
        .current_dir(temp.path())
        .args(["codemods", "run", "--uid", "1.2.0-mark-private-document"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--framework"));
}

#[test]
fn test_run_by_uid_dry_leaves_files_untouched() {
    let temp = create_temp_project();

    upgrader()
        .current_dir(temp.path())
        .args([
            "codemods",
            "run",
            "--dry",
            "--framework",
            "@acme/core",
            "--uid",
            "1.2.0-mark-private-document",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mark Private"))
        .stdout(predicate::str::contains("Dry run"));

    let manifest = fs::read_to_string(temp.path().join("package.json")).unwrap();
    assert_eq!(manifest, MANIFEST);
}

#[test]
fn test_run_by_uid_writes_and_reports_json() {
    let temp = create_temp_project();

    upgrader()
        .current_dir(temp.path())
        .args([
            "codemods",
            "run",
            "--framework",
            "@acme/core",
            "--uid",
            "1.2.0-mark-private-document",
            "--report",
            "out/run.json",
        ])
        .assert()
        .success();

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(temp.path().join("package.json")).unwrap())
            .unwrap();
    assert_eq!(manifest["private"], serde_json::json!(true));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(temp.path().join("out/run.json")).unwrap())
            .unwrap();
    assert_eq!(report["schema"], "upgrader.run.v1");
    assert_eq!(report["success"], true);
    assert_eq!(report["totals"]["ok"], 1);
}

#[test]
fn test_markdown_report_by_extension() {
    let temp = create_temp_project();

    upgrader()
        .current_dir(temp.path())
        .args([
            "codemods",
            "run",
            "--dry",
            "--framework",
            "@acme/core",
            "--uid",
            "1.2.0-mark-private-document",
            "--report",
            "run.md",
        ])
        .assert()
        .success();

    let md = fs::read_to_string(temp.path().join("run.md")).unwrap();
    assert!(md.starts_with("# upgrader run"));
    assert!(md.contains("| 1 | 1.2.0 | document | Mark Private | 1 | 0 | 0 | 0 |"));
}

#[test]
fn test_run_unknown_uid_fails() {
    let temp = create_temp_project();

    upgrader()
        .current_dir(temp.path())
        .args([
            "codemods",
            "run",
            "--framework",
            "@acme/core",
            "--uid",
            "9.9.9-missing-code",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown codemod: 9.9.9-missing-code"));
}

#[test]
fn test_config_file_supplies_framework_and_codemods_dir() {
    let temp = create_temp_project();
    let root = temp.path();
    fs::rename(root.join("codemods"), root.join("migrations")).unwrap();
    write(
        &root.join("upgrader.toml"),
        "[framework]\npackage = \"@acme/core\"\n\n[codemods]\ndir = \"migrations\"\n",
    );

    upgrader()
        .current_dir(root)
        .args(["codemods", "run", "--dry", "--range", "=1.2.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mark Private"));
}

#[test]
fn test_project_path_flag() {
    let temp = create_temp_project();
    let elsewhere = tempfile::tempdir().unwrap();

    upgrader()
        .current_dir(elsewhere.path())
        .args(["codemods", "list", "--project-path"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Mark Private"));
}
