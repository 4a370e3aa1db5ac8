//! Argument parsing, help output and the error contract.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

pub fn autodeploy() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("autodeploy"));
    cmd.env("NO_COLOR", "1")
        .env_remove("AUTODEPLOY_CONFIG")
        .env_remove("AUTODEPLOY_SSH_PASSWORD")
        .env_remove("AUTODEPLOY_LOG");
    cmd
}

#[test]
fn test_cli_no_args_shows_help_and_exits_two() {
    autodeploy()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_cli_help_lists_every_command() {
    let output = autodeploy().arg("--help").output().expect("run");
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    for command in ["init", "deploy", "status", "rollback", "domain", "logs"] {
        assert!(help.contains(command), "missing {command} in:\n{help}");
    }
}

#[test]
fn test_cli_version_flag_shows_version() {
    autodeploy()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("autodeploy"));
}

#[test]
fn test_unknown_command_is_a_usage_error() {
    autodeploy().arg("launch").assert().code(2);
}

#[test]
fn test_domain_operations_conflict() {
    autodeploy()
        .args(["domain", "--list", "--renew"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_logs_rejects_non_numeric_lines() {
    autodeploy()
        .args(["logs", "--lines", "many"])
        .assert()
        .code(2);
}

#[test]
fn test_missing_config_fails_with_hint() {
    let dir = tempfile::tempdir().expect("tempdir");
    autodeploy()
        .current_dir(dir.path())
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration file not found"))
        .stderr(predicate::str::contains("autodeploy init"));
}

#[test]
fn test_missing_config_json_error_object() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = autodeploy()
        .current_dir(dir.path())
        .args(["deploy", "--json"])
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(1));
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is a JSON object");
    assert_eq!(value["error"], true);
    assert_eq!(value["code"], "CONFIG_NOT_FOUND");
    assert!(
        value["message"]
            .as_str()
            .is_some_and(|m| m.contains("not found"))
    );
}

#[test]
fn test_init_refuses_to_run_non_interactively() {
    let dir = tempfile::tempdir().expect("tempdir");
    autodeploy()
        .current_dir(dir.path())
        .args(["init", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("interactive terminal"));
    assert!(!dir.path().join("deploy-config.yml").exists());
}
