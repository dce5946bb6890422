//! CLI subprocess integration tests.
//!
//! These tests invoke the `vttpack` binary as a subprocess and verify exit
//! codes, stdout content, and the files it rewrites.

use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;

fn vttpack_bin(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vttpack"));
    cmd.current_dir(dir);
    cmd.env_remove("VTTPACK_LOG");
    cmd.env_remove("GITHUB_REPOSITORY");
    cmd
}

fn project_with(manifest: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/module.json"), manifest).unwrap();
    dir
}

const LEGACY_MANIFEST: &str = r#"{
    "name": "foo",
    "title": "Foo",
    "author": "Bob",
    "minimumCoreVersion": "9",
    "compatibleCoreVersion": "10",
    "system": ["dnd5e"],
    "dependencies": [{"name": "lib-wrapper", "type": "module"}]
}"#;

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn cli_version_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let output = vttpack_bin(dir.path()).arg("--version").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("vttpack"), "{stdout}");
}

#[test]
fn cli_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    let output = vttpack_bin(dir.path()).arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["inspect", "migrate", "publish", "reupload", "instances"] {
        assert!(stdout.contains(command), "help must list '{command}'");
    }
}

#[test]
fn cli_inspect_json_reports_revision() {
    let dir = project_with(LEGACY_MANIFEST);
    let output = vttpack_bin(dir.path())
        .args(["--json", "inspect"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["kind"], "module");
    assert_eq!(value["revision"], "v8");
    assert_eq!(value["manifest"]["id"], "foo");
    assert_eq!(
        value["manifest"]["relationships"]["systems"][0]["id"],
        "dnd5e"
    );
}

#[test]
fn cli_migrate_rewrites_in_place() {
    let dir = project_with(LEGACY_MANIFEST);
    let output = vttpack_bin(dir.path()).arg("migrate").output().unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let value = read_json(&dir.path().join("src/module.json"));
    assert_eq!(value["id"], "foo");
    assert_eq!(value["authors"], serde_json::json!([{"name": "Bob"}]));
    assert!(value.get("name").is_none());
    assert!(value.get("dependencies").is_none());
}

#[test]
fn cli_migrate_legacy_keeps_old_fields() {
    let dir = project_with(LEGACY_MANIFEST);
    fs::write(dir.path().join("src/style.css"), "").unwrap();
    let output = vttpack_bin(dir.path())
        .args(["migrate", "--legacy", "--inject-css"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value = read_json(&dir.path().join("src/module.json"));
    assert_eq!(value["name"], "foo");
    assert_eq!(value["system"], serde_json::json!(["dnd5e"]));
    assert_eq!(value["styles"], serde_json::json!(["style.css"]));
}

#[test]
fn cli_migrate_dry_run_leaves_file() {
    let dir = project_with(LEGACY_MANIFEST);
    let output = vttpack_bin(dir.path())
        .args(["migrate", "--dry-run"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let printed: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(printed["id"], "foo");
    let on_disk = fs::read_to_string(dir.path().join("src/module.json")).unwrap();
    assert_eq!(on_disk, LEGACY_MANIFEST);
}

#[test]
fn cli_missing_manifest_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let output = vttpack_bin(dir.path()).arg("inspect").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("could not find a module.json"), "{stderr}");
}

#[test]
fn cli_malformed_manifest_exits_2() {
    let dir = project_with("[1, 2, 3]");
    let output = vttpack_bin(dir.path()).arg("inspect").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn cli_instances_lists_install_dirs() {
    let dir = project_with(r#"{"id": "my-module"}"#);
    fs::write(
        dir.path().join("foundryconfig.json"),
        r#"{"main": {"dataPath": "/data/main", "foundryPath": "/opt/main"}}"#,
    )
    .unwrap();

    let output = vttpack_bin(dir.path())
        .args(["--json", "instances", "--fi", "main"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value[0]["key"], "main");
    assert_eq!(value[0]["install_dir"], "/data/main/Data/modules/my-module");
}

#[test]
fn cli_unknown_instance_key_fails() {
    let dir = project_with(r#"{"id": "my-module"}"#);
    fs::write(
        dir.path().join("foundryconfig.json"),
        r#"{"main": {"dataPath": "/data/main", "foundryPath": "/opt/main"}}"#,
    )
    .unwrap();

    let output = vttpack_bin(dir.path())
        .args(["instances", "--fi", "staging"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("runInstanceKey (staging) not found in foundryconfig.json"),
        "{stderr}"
    );
    assert!(output.stdout.is_empty());
}

#[test]
fn cli_bad_run_config_fails() {
    let dir = project_with(r#"{"id": "my-module"}"#);
    fs::write(
        dir.path().join("foundryconfig.json"),
        r#"{"main": {"dataPath": 1, "foundryPath": "/opt"}}"#,
    )
    .unwrap();
    let output = vttpack_bin(dir.path()).arg("instances").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("main.dataPath"), "{stderr}");
}

#[test]
fn cli_publish_without_version_exits_3() {
    let dir = project_with(r#"{"id": "my-module"}"#);
    let output = vttpack_bin(dir.path()).arg("publish").output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing version number"), "{stderr}");
}

#[test]
fn cli_github_manifest_from_environment() {
    let dir = project_with(r#"{"id": "my-module", "version": "v1.0.0"}"#);
    let dest = dir.path().join("dist");
    fs::create_dir_all(&dest).unwrap();

    let output = vttpack_bin(dir.path())
        .env("GITHUB_REPOSITORY", "owner/my-module")
        .args(["updateZipManifestForGithub", "--dest", "dist"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let value = read_json(&dest.join("module.json"));
    assert_eq!(
        value["manifest"],
        "https://github.com/owner/my-module/releases/download/latest/module.json"
    );
    assert_eq!(value["url"], "https://github.com/owner/my-module");
}

#[test]
fn cli_completions_bash() {
    let dir = tempfile::tempdir().unwrap();
    let output = vttpack_bin(dir.path())
        .args(["completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("vttpack"));
}
