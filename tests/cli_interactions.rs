//! CLI options interaction tests
//!
//! These tests validate flag parsing, validation errors and exit codes.
//! None of them reach the measurement path, so no network access is needed:
//! malformed flags are rejected by the parser (exit 2), semantically invalid
//! values by validation (exit 1).

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;

/// Command with an isolated working directory so a stray .env file cannot
/// leak configuration into the test
fn test_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ist").unwrap();
    cmd.current_dir(dir.path());
    cmd
}

#[test]
fn test_help_lists_all_options() {
    let dir = TempDir::new().unwrap();
    test_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--number"))
        .stdout(predicate::str::contains("--delay"))
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--servers"))
        .stdout(predicate::str::contains("--streams"))
        .stdout(predicate::str::contains("--phase-timeout"))
        .stdout(predicate::str::contains("--no-csv"))
        .stdout(predicate::str::contains("--no-color"));
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    test_cmd(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_number_zero_is_rejected() {
    let dir = TempDir::new().unwrap();
    test_cmd(&dir)
        .arg("--number")
        .arg("0")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("--number must be at least 1"));
}

#[test]
fn test_malformed_number_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    test_cmd(&dir)
        .arg("--number")
        .arg("abc")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_conflicting_color_flags_are_rejected() {
    let dir = TempDir::new().unwrap();
    test_cmd(&dir)
        .arg("--color")
        .arg("--no-color")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "Cannot specify both --color and --no-color",
        ));
}

#[test]
fn test_streams_out_of_range_is_rejected() {
    let dir = TempDir::new().unwrap();
    for value in ["0", "17"] {
        test_cmd(&dir)
            .arg("--streams")
            .arg(value)
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains(
                "--streams must be between 1 and 16",
            ));
    }
}

#[test]
fn test_phase_timeout_zero_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    test_cmd(&dir)
        .arg("--phase-timeout")
        .arg("0")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("greater than 0"));
}

#[test]
fn test_empty_output_without_no_csv_is_rejected() {
    let dir = TempDir::new().unwrap();
    test_cmd(&dir)
        .arg("--output")
        .arg("")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "--output must not be empty unless --no-csv is given",
        ));
}

#[test]
fn test_number_above_limit_fails_config_validation() {
    let dir = TempDir::new().unwrap();
    test_cmd(&dir)
        .arg("--number")
        .arg("101")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Test count cannot exceed 100"));
}

#[test]
fn test_malformed_environment_override_is_rejected() {
    let dir = TempDir::new().unwrap();
    test_cmd(&dir)
        .env("SPEEDTEST_NUMBER", "abc")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid SPEEDTEST_NUMBER"));
}

#[test]
fn test_color_flag_wins_over_no_color_env() {
    // The header prints before the catalog is read, so a missing catalog
    // still leaves the colored banner on stdout
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("no-such-catalog.json");
    test_cmd(&dir)
        .env("NO_COLOR", "1")
        .arg("--color")
        .arg("--servers")
        .arg(&missing)
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Internet Speed Test"))
        .stdout(predicate::str::contains("\u{1b}["));
}

#[test]
fn test_no_color_env_disables_colors_without_flags() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("no-such-catalog.json");
    test_cmd(&dir)
        .env("NO_COLOR", "1")
        .arg("--servers")
        .arg(&missing)
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Internet Speed Test"))
        .stdout(predicate::str::contains("\u{1b}").not());
}

#[test]
fn test_missing_catalog_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("no-such-catalog.json");
    test_cmd(&dir)
        .arg("--servers")
        .arg(&missing)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Cannot read server catalog"));
}

#[test]
fn test_malformed_catalog_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let catalog = dir.path().join("servers.json");
    std::fs::write(&catalog, "{ not json ]").unwrap();
    test_cmd(&dir)
        .arg("--servers")
        .arg(&catalog)
        .assert()
        .failure()
        .code(1);
}
