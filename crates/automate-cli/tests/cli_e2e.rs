//! End-to-end CLI tests using `assert_cmd`
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to get cargo binary or fail test
fn cargo_bin() -> Command {
    let mut command =
        Command::cargo_bin("automate").unwrap_or_else(|err| panic!("Binary not found: {err}"));
    for key in [
        "OPENAI_BASE_URL",
        "OPENAI_API_KEY",
        "KNOWLEDGE_ENVIRONMENT_URL",
        "WORK_DIR",
        "RUST_LOG",
    ] {
        command.env_remove(key);
    }
    command
}

/// Helper to create temp dir or fail test
fn temp_dir() -> TempDir {
    TempDir::new().unwrap_or_else(|err| panic!("Failed to create temp dir: {err}"))
}

#[test]
fn test_cli_help() {
    cargo_bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("categorize"));
}

#[test]
fn test_cli_invalid_command() {
    cargo_bin().arg("invalid-command-xyz").assert().failure();
}

#[test]
fn test_run_requires_request() {
    cargo_bin()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<REQUEST>"));
}

#[test]
fn test_init_config_writes_loadable_file() {
    let temp = temp_dir();
    let path = temp.path().join("nested").join("config.toml");

    cargo_bin()
        .args(["init-config", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("# Automate Configuration File"));
    assert!(contents.contains("max_cycles = 3"));

    // A second write without --force is refused.
    cargo_bin()
        .args(["init-config", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    cargo_bin()
        .args(["init-config", "--force", "--config"])
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn test_missing_config_file_fails() {
    let temp = temp_dir();
    cargo_bin()
        .args(["run", "restart httpd", "--config"])
        .arg(temp.path().join("absent.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.toml"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let temp = temp_dir();
    let path = temp.path().join("config.toml");
    fs::write(&path, "[orchestration]\nmax_cycles = 0\n").unwrap();

    cargo_bin()
        .args(["run", "restart httpd", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_cycles"));
}

#[test]
fn test_blank_request_fails_without_network() {
    let temp = temp_dir();
    let path = temp.path().join("config.toml");
    fs::write(&path, "[inference]\nbase_url = \"http://127.0.0.1:9/v1\"\n").unwrap();

    cargo_bin()
        .args(["run", "   ", "--research", "RHEL 9", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "'user_request' is a required argument and cannot be empty",
        ));
}

#[test]
fn test_categorize_empty_file_fails() {
    let temp = temp_dir();
    let config = temp.path().join("config.toml");
    fs::write(&config, "[inference]\nbase_url = \"http://127.0.0.1:9/v1\"\n").unwrap();
    let incidents = temp.path().join("incidents.txt");
    fs::write(&incidents, "\n   \n").unwrap();

    cargo_bin()
        .arg("categorize")
        .arg(&incidents)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("'incidents' is a required argument"));

    cargo_bin()
        .args(["categorize", "--labels"])
        .arg(&incidents)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("'labels' is a required argument"));
}

#[test]
fn test_categorize_help_describes_incidents() {
    cargo_bin()
        .args(["categorize", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--labels"))
        .stdout(predicate::str::contains("incident"));
}
