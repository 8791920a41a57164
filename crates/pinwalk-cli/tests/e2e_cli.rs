//! E2E CLI tests covering:
//! - Usage errors (`pinwalk scan` without a URL, empty URL)
//! - HTML report generation from a JSON scan result (`pinwalk report`)
//! - Shell completions (`pinwalk completions`)
//!
//! Each test runs the `pinwalk` binary as a subprocess in an isolated temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Build a Command targeting the pinwalk binary, rooted in `dir`.
fn pinwalk_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pinwalk"));
    cmd.current_dir(dir);
    cmd.env("PINWALK_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    cmd.env_remove("PINWALK_FORMAT");
    cmd
}

const SAMPLE_RESULT: &str = r#"{
  "dependencies": {
    "Main Repository": ["org/build@v1", "actions/checkout@v4"],
    "org/build@v1": [],
    "actions/checkout@v4": []
  },
  "docker_warnings": {
    "org/build@v1": ["Unpinned Docker FROM => 'node:20 <latest>'"]
  },
  "all_actions": ["actions/checkout@v4", "org/build@v1"]
}"#;

// ---------------------------------------------------------------------------
// Usage errors
// ---------------------------------------------------------------------------

#[test]
fn scan_without_url_is_a_usage_error() {
    let dir = TempDir::new().expect("tempdir");
    pinwalk_cmd(dir.path())
        .arg("scan")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("REPO_URL"));
}

#[test]
fn scan_with_empty_url_reports_missing_locator() {
    let dir = TempDir::new().expect("tempdir");
    pinwalk_cmd(dir.path())
        .args(["scan", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1001"));
}

#[test]
fn invalid_project_config_is_fatal() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("pinwalk.toml"), "max_actions = \"lots\"\n").expect("write");
    pinwalk_cmd(dir.path())
        .args(["scan", "https://example.invalid/org/repo.git"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1002"));
}

#[test]
fn unknown_subcommand_fails() {
    let dir = TempDir::new().expect("tempdir");
    pinwalk_cmd(dir.path()).arg("frobnicate").assert().failure();
}

// ---------------------------------------------------------------------------
// report
// ---------------------------------------------------------------------------

#[test]
fn report_writes_escaped_html() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("result.json");
    let output = dir.path().join("report.html");
    std::fs::write(&input, SAMPLE_RESULT).expect("write input");

    pinwalk_cmd(dir.path())
        .args(["report", "result.json", "report.html", "--name", "org/repo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("HTML report generated"));

    let html = std::fs::read_to_string(&output).expect("read html");
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Dependency Report for org/repo"));
    assert!(html.contains("<h2>Key Actions</h2>"));
    assert!(html.contains("&lt;latest&gt;"));
    assert!(html.contains("lessImportantTable"));
    assert!(html.contains("<strong>actions/checkout@v4</strong>"));
}

#[test]
fn report_name_defaults_to_input_stem() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("acme-site.json"), SAMPLE_RESULT).expect("write input");

    pinwalk_cmd(dir.path())
        .args(["report", "acme-site.json", "out.html"])
        .assert()
        .success();

    let html = std::fs::read_to_string(dir.path().join("out.html")).expect("read html");
    assert!(html.contains("Dependency Report for acme-site"));
}

#[test]
fn report_with_missing_input_fails() {
    let dir = TempDir::new().expect("tempdir");
    pinwalk_cmd(dir.path())
        .args(["report", "absent.json", "out.html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.json"));
    assert!(!dir.path().join("out.html").exists());
}

#[test]
fn report_with_malformed_input_fails() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("bad.json"), "{ not json").expect("write input");
    pinwalk_cmd(dir.path())
        .args(["report", "bad.json", "out.html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse"));
}

// ---------------------------------------------------------------------------
// completions
// ---------------------------------------------------------------------------

#[test]
fn completions_emit_a_script() {
    let dir = TempDir::new().expect("tempdir");
    pinwalk_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pinwalk"));
}

#[test]
fn completions_reject_unknown_shell() {
    let dir = TempDir::new().expect("tempdir");
    pinwalk_cmd(dir.path())
        .args(["completions", "cmd.exe"])
        .assert()
        .failure();
}
