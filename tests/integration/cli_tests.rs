//! Integration tests for the CLI binary.
//!
//! This test is registered as a [[test]] in the records-registry-cli crate
//! so that CARGO_BIN_EXE_srr is available.

use std::path::Path;
use std::process::{Command, Output};

/// Get a Command pointing to the `srr` binary with an isolated home.
fn srr(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_srr"));
    cmd.arg("--home")
        .arg(home)
        .env("SRR_PASSPHRASE", "registrar-pass")
        .env_remove("SRR_HOME");
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    srr(home)
        .args(args)
        .output()
        .expect("failed to execute srr")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_ok(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{what} should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn cli_responds_to_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_srr"))
        .arg("--help")
        .output()
        .expect("failed to execute srr --help");

    assert_ok(&output, "srr --help");
    let text = stdout(&output);
    assert!(
        text.contains("srr") || text.contains("Usage"),
        "srr --help output should contain usage information, got: {text}"
    );
}

#[test]
fn cli_responds_to_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_srr"))
        .arg("--version")
        .output()
        .expect("failed to execute srr --version");

    assert_ok(&output, "srr --version");
    let text = stdout(&output);
    assert!(
        text.contains("0.1") || text.contains("srr"),
        "srr --version should contain version info, got: {text}"
    );
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = Command::new(env!("CARGO_BIN_EXE_srr"))
        .arg("--nonexistent-flag")
        .output()
        .expect("failed to execute srr");

    assert!(
        !output.status.success(),
        "srr with unknown flag should exit with error"
    );
}

#[test]
fn cli_fingerprint_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let first = run(dir.path(), &["fingerprint", "--text", "transcript"]);
    let second = run(dir.path(), &["fingerprint", "--text", "transcript"]);
    assert_ok(&first, "srr fingerprint");
    assert_eq!(stdout(&first), stdout(&second));
    assert!(stdout(&first).trim().starts_with("0x"));
    assert_eq!(stdout(&first).trim().len(), 66);
}

#[test]
fn cli_commands_fail_without_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["owner"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("srr init"));
}

#[test]
fn cli_issue_get_verify_flow() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path();
    let record = [
        "--institution",
        "UniversityA",
        "--student",
        "Student123",
        "--period",
        "2024-01",
    ];

    assert_ok(&run(home, &["key", "new", "--name", "university"]), "key new");
    assert_ok(&run(home, &["key", "new", "--name", "outsider"]), "key new");
    assert_ok(&run(home, &["init", "--key", "university"]), "init");

    let shown = run(home, &["key", "show", "--name", "university"]);
    let owner = run(home, &["owner"]);
    assert_ok(&owner, "owner");
    assert!(stdout(&shown).contains(stdout(&owner).trim()));

    let document = home.join("transcript.txt");
    std::fs::write(&document, "Student123: A, A, B+").unwrap();
    let doc = document.to_str().unwrap();

    let mut issue = vec!["issue", "--key", "university"];
    issue.extend_from_slice(&record);
    issue.extend_from_slice(&["--file", doc]);
    assert_ok(&run(home, &issue), "issue");

    // Second issuance of the same id is refused.
    let again = run(home, &issue);
    assert!(!again.status.success());
    assert!(String::from_utf8_lossy(&again.stderr).contains("already issued"));

    // Outsiders are refused before the duplicate check.
    let mut outsider = vec!["issue", "--key", "outsider"];
    outsider.extend_from_slice(&record);
    outsider.extend_from_slice(&["--file", doc]);
    let denied = run(home, &outsider);
    assert!(!denied.status.success());
    assert!(String::from_utf8_lossy(&denied.stderr).contains("Unauthorized"));

    let mut get = vec!["get"];
    get.extend_from_slice(&record);
    let got = run(home, &get);
    assert_ok(&got, "get");
    let expected = run(home, &["fingerprint", "--file", doc]);
    assert!(stdout(&got).contains(stdout(&expected).trim()));

    let mut verify = vec!["verify"];
    verify.extend_from_slice(&record);
    verify.extend_from_slice(&["--file", doc]);
    let matched = run(home, &verify);
    assert_ok(&matched, "verify");
    assert!(stdout(&matched).starts_with("MATCH"));

    std::fs::write(&document, "Student123: A, A, A").unwrap();
    let mismatched = run(home, &verify);
    assert!(!mismatched.status.success());
    assert!(stdout(&mismatched).starts_with("MISMATCH"));

    let audit = run(home, &["audit"]);
    assert_ok(&audit, "audit");
    assert!(stdout(&audit).contains("Records: 1"));

    let log = run(home, &["log"]);
    assert_ok(&log, "log");
    assert!(stdout(&log).contains("RecordIssued"));
}

#[test]
fn cli_get_unknown_record_fails() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path();
    assert_ok(&run(home, &["key", "new", "--name", "university"]), "key new");
    assert_ok(&run(home, &["init", "--key", "university"]), "init");

    let missing = format!("0x{}", "ab".repeat(32));
    let output = run(home, &["get", "--record-id", &missing]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}
