//! CLI smoke tests: argument surface and failure modes that need no
//! container runtime.

use assert_cmd::Command;
use predicates::prelude::*;

fn acm() -> Command {
    Command::cargo_bin("acm").unwrap()
}

#[test]
fn help_lists_subcommands() {
    acm()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("up"))
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("run-hooks"))
        .stdout(predicate::str::contains("instructions"))
        .stdout(predicate::str::contains("reopen"))
        .stdout(predicate::str::contains("doctor"));
}

#[test]
fn version_flag_works() {
    acm()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("acm"));
}

#[test]
fn missing_subcommand_is_an_error() {
    acm().assert().failure();
}

#[test]
fn up_without_config_reports_missing_descriptor() {
    let workspace = tempfile::tempdir().unwrap();
    acm()
        .args(["--workspace-folder"])
        .arg(workspace.path())
        .arg("up")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No devcontainer configuration"));
}

#[test]
fn doctor_fails_for_missing_runtime_binary() {
    acm()
        .args(["--runtime-path", "definitely-not-a-real-binary-acm", "doctor"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not healthy"));
}

#[test]
fn ls_fails_for_missing_runtime_binary() {
    acm()
        .args(["--runtime-path", "definitely-not-a-real-binary-acm", "ls"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to list containers"));
}

#[test]
fn instructions_resolve_without_runtime() {
    let workspace = tempfile::tempdir().unwrap();
    std::fs::write(
        workspace.path().join(".appcontainer.json"),
        r#"{"name": "acm-smoke", "image": "node:18", "forwardPorts": ["2222:22"]}"#,
    )
    .unwrap();

    acm()
        .args(["--workspace-folder"])
        .arg(workspace.path())
        .arg("instructions")
        .assert()
        .success()
        .stdout(predicate::str::contains("acm-smoke"))
        .stdout(predicate::str::contains("2222"));
}
