//! Integration tests for the node-exporter-charm CLI.
//!
//! Only paths that stop before touching the host are exercised here: configuration,
//! deferral, state persistence and fetch failures against an empty mirror.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

// Helper function to create a clean command instance
fn charm() -> Command {
  let mut cmd = Command::cargo_bin("node-exporter-charm").unwrap();
  cmd.env_remove("NODE_EXPORTER_VERSION").env_remove("RUST_LOG");
  cmd
}

// Helper to get a temporary state file path
fn temp_state() -> (TempDir, PathBuf) {
  let dir = tempdir().unwrap();
  let state_path = dir.path().join("state.json");
  (dir, state_path)
}

fn read_state(path: &Path) -> serde_json::Value {
  serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_scrape_jobs_json() {
  charm()
    .arg("scrape-jobs")
    .assert()
    .success()
    .stdout(predicate::str::contains(r#"[{"static_configs":[{"targets":["*:9100"]}]}]"#));
}

#[test]
fn test_install_without_version_is_deferred() {
  let (_dir, state_path) = temp_state();

  charm()
    .arg("install")
    .arg("--state-file")
    .arg(&state_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("Need node-exporter-version config to continue."))
    .stdout(predicate::str::contains("Deferred:"));

  let state = read_state(&state_path);
  assert_eq!(state["unit"]["status"]["state"], "blocked");
  assert_eq!(state["deferred"], serde_json::json!(["install"]));

  charm()
    .arg("status")
    .arg("--state-file")
    .arg(&state_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("blocked"))
    .stdout(predicate::str::contains("install"));
}

#[test]
fn test_reemit_without_version_stays_deferred() {
  let (_dir, state_path) = temp_state();
  charm().arg("install").arg("--state-file").arg(&state_path).assert().success();

  charm()
    .arg("reemit")
    .arg("--state-file")
    .arg(&state_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("Need node-exporter-version config to continue."));

  assert_eq!(read_state(&state_path)["deferred"], serde_json::json!(["install"]));
}

#[test]
fn test_status_on_fresh_unit() {
  let (_dir, state_path) = temp_state();

  charm()
    .arg("status")
    .arg("--state-file")
    .arg(&state_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("uninstalled"));

  assert!(!state_path.exists());
}

#[test]
fn test_invalid_config_file_fails() {
  let (dir, state_path) = temp_state();
  let config_path = dir.path().join("config.json");
  std::fs::write(&config_path, "node-exporter-version = 1.7.0").unwrap();

  charm()
    .arg("install")
    .arg("--config")
    .arg(&config_path)
    .arg("--state-file")
    .arg(&state_path)
    .assert()
    .failure();

  assert!(!state_path.exists());
}

#[test]
fn test_install_from_empty_mirror_fails() {
  let (dir, state_path) = temp_state();
  let mirror = dir.path().join("mirror");
  std::fs::create_dir_all(&mirror).unwrap();

  charm()
    .arg("install")
    .arg("--node-exporter-version")
    .arg("1.7.0")
    .arg("--release-origin")
    .arg(&mirror)
    .arg("--state-file")
    .arg(&state_path)
    .assert()
    .failure()
    .stderr(predicate::str::contains("release archive not found"));

  let state = read_state(&state_path);
  assert_eq!(state["unit"]["status"]["state"], "error");
  assert_eq!(state["deferred"], serde_json::json!([]));
}

#[test]
fn test_version_from_environment() {
  let (dir, state_path) = temp_state();
  let mirror = dir.path().join("mirror");
  std::fs::create_dir_all(&mirror).unwrap();

  charm()
    .env("NODE_EXPORTER_VERSION", "1.6.1")
    .arg("install")
    .arg("--release-origin")
    .arg(&mirror)
    .arg("--state-file")
    .arg(&state_path)
    .assert()
    .failure()
    .stderr(predicate::str::contains("v1.6.1/node_exporter-1.6.1.linux-amd64.tar.gz"));
}
