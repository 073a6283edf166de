//! CLI integration tests for the pgsession command-line interface.
//!
//! These tests do not require a running PostgREST server. They cover
//! help output, argument parsing and failures that happen before or at
//! the first request.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a command for the pgsession binary.
fn pgsession() -> Command {
    let mut cmd = Command::cargo_bin("pgsession").unwrap();
    cmd.env_remove("PGSESSION_BASE_URL")
        .env_remove("PGSESSION_CONFIG");
    cmd
}

/// A base URL nothing is listening on.
fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    pgsession()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("pgsession"))
        .stdout(predicate::str::contains("PostgREST"));
}

#[test]
fn test_version_displays() {
    pgsession()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pgsession"));
}

#[test]
fn test_help_lists_subcommands() {
    pgsession()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("set"))
        .stdout(predicate::str::contains("touch"))
        .stdout(predicate::str::contains("destroy"))
        .stdout(predicate::str::contains("prune"))
        .stdout(predicate::str::contains("watch"));
}

#[test]
fn test_set_help_mentions_max_age() {
    pgsession()
        .args(["set", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--max-age"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument Parsing Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_global_flags_accepted() {
    pgsession()
        .args(["--verbose", "--json", "--base-url", "http://db:3000", "--help"])
        .assert()
        .success();
}

#[test]
fn test_no_subcommand_fails() {
    pgsession().assert().failure();
}

#[test]
fn test_get_requires_sid() {
    pgsession()
        .arg("get")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<SID>"));
}

#[test]
fn test_set_rejects_non_object_payload() {
    pgsession()
        .args(["--base-url", &dead_url(), "set", "abc", "[1,2,3]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON object"));
}

#[test]
fn test_watch_rejects_zero_interval() {
    pgsession()
        .args(["--base-url", &dead_url(), "watch", "--interval", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("greater than zero"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_missing_config_file_fails() {
    pgsession()
        .args(["--config", "/nonexistent/pgsession.toml", "get", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn test_watch_refuses_disabled_pruning() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "pruneSessionInterval = false").unwrap();

    pgsession()
        .args(["--config"])
        .arg(file.path())
        .arg("watch")
        .assert()
        .failure()
        .stderr(predicate::str::contains("pruning is disabled"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection Failure Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_get_unreachable_server_fails() {
    pgsession()
        .args(["--base-url", &dead_url(), "get", "abc"])
        .assert()
        .failure();
}

#[test]
fn test_prune_unreachable_server_fails() {
    pgsession()
        .args(["--base-url", &dead_url(), "prune"])
        .assert()
        .failure();
}
