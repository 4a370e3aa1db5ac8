//! Commands run inside a project directory with a configuration file.

#![allow(clippy::expect_used)]

use std::path::Path;

use predicates::prelude::*;
use tempfile::TempDir;

use crate::cli_tests::autodeploy;

const CONFIG: &str = r"project:
  name: shop
  type: nodejs
server:
  host: 203.0.113.7
  username: deploy
  password: hunter2
  deployPath: /var/www/shop
git:
  repository: git@example.com:acme/shop.git
  branch: main
build:
  startCommand: npm start
  port: 3000
domain: shop.example.com
";

fn project(config: &str) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("deploy-config.yml"), config).expect("write config");
    dir
}

fn history_path(dir: &Path) -> std::path::PathBuf {
    dir.join(".autodeploy").join("history.json")
}

#[test]
fn test_domain_list_shows_configured_domain() {
    let dir = project(CONFIG);
    autodeploy()
        .current_dir(dir.path())
        .args(["domain", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://shop.example.com"));
}

#[test]
fn test_domain_list_json() {
    let dir = project(CONFIG);
    let output = autodeploy()
        .current_dir(dir.path())
        .args(["domain", "--list", "--json"])
        .output()
        .expect("run");

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["domain"], "shop.example.com");
}

#[test]
fn test_domain_list_without_domain() {
    let dir = project(&CONFIG.replace("domain: shop.example.com\n", ""));
    autodeploy()
        .current_dir(dir.path())
        .args(["domain", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No domain configured"));
}

#[test]
fn test_config_path_from_environment() {
    let dir = project(CONFIG);
    let elsewhere = tempfile::tempdir().expect("tempdir");
    autodeploy()
        .current_dir(elsewhere.path())
        .env("AUTODEPLOY_CONFIG", dir.path().join("deploy-config.yml"))
        .args(["domain", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("shop.example.com"));
}

#[test]
fn test_rollback_with_empty_history() {
    let dir = project(CONFIG);
    autodeploy()
        .current_dir(dir.path())
        .args(["rollback", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "No previous successful deployments",
        ));
    assert!(!history_path(dir.path()).exists());
}

#[test]
fn test_rollback_with_single_success_json() {
    let dir = project(CONFIG);
    std::fs::create_dir_all(dir.path().join(".autodeploy")).expect("mkdir");
    let history = r#"[{"branch":"main","commit":"c1","status":"success","timestamp":"2024-05-01T10:00:00Z","type":"deploy"}]"#;
    std::fs::write(history_path(dir.path()), history).expect("write history");

    let output = autodeploy()
        .current_dir(dir.path())
        .args(["rollback", "--json"])
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(1));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["code"], "NO_ROLLBACK_TARGET");
    let after = std::fs::read_to_string(history_path(dir.path())).expect("history");
    assert_eq!(after, history, "history must not be rewritten");
}

#[test]
fn test_invalid_project_name_is_rejected() {
    let dir = project(&CONFIG.replace("name: shop", "name: my shop"));
    let output = autodeploy()
        .current_dir(dir.path())
        .args(["status", "--json"])
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(1));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["code"], "CONFIG_INVALID");
    assert!(
        value["message"]
            .as_str()
            .is_some_and(|m| m.contains("project.name"))
    );
}

#[test]
fn test_missing_credentials_fail_before_connecting() {
    let dir = project(&CONFIG.replace("  password: hunter2\n", ""));
    autodeploy()
        .current_dir(dir.path())
        .arg("logs")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("server.password or server.privateKey"));
}

#[test]
fn test_unknown_project_type_is_rejected() {
    let dir = project(&CONFIG.replace("type: nodejs", "type: cobol"));
    autodeploy()
        .current_dir(dir.path())
        .arg("status")
        .assert()
        .code(1);
}

#[test]
fn test_remove_other_domain_is_refused() {
    let dir = project(CONFIG);
    autodeploy()
        .current_dir(dir.path())
        .args(["domain", "--remove", "other.example.com", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("is not configured for this project"));
    let config = std::fs::read_to_string(dir.path().join("deploy-config.yml")).expect("config");
    assert!(config.contains("shop.example.com"));
}
