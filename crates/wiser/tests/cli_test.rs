//! Integration tests for the `wiser` CLI binary.
//!
//! Argument parsing, config management and error exit codes run without a
//! hub; the REST round trips run against a wiremock server.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// A `wiser` command isolated from the user's environment and config.
fn wiser_cmd(config: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("wiser");
    cmd.env("WISER_CONFIG", config)
        .env("HOME", "/tmp/wiser-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/wiser-cli-test-nonexistent")
        .env_remove("WISER_PROFILE")
        .env_remove("WISER_HOST")
        .env_remove("WISER_API_KEY")
        .env_remove("WISER_OUTPUT")
        .env_remove("WISER_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn temp_config() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    (dir, path)
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// An address nothing listens on.
fn dead_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let (_dir, config) = temp_config();
    let output = wiser_cmd(&config).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    let (_dir, config) = temp_config();
    wiser_cmd(&config).arg("--help").assert().success().stdout(
        predicate::str::contains("loads")
            .and(predicate::str::contains("buttons"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    let (_dir, config) = temp_config();
    wiser_cmd(&config)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("wiser"));
}

#[test]
fn test_completions_zsh() {
    let (_dir, config) = temp_config();
    wiser_cmd(&config)
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_invalid_subcommand() {
    let (_dir, config) = temp_config();
    let output = wiser_cmd(&config).arg("foobar").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("foobar"));
}

// ── Error exit codes ────────────────────────────────────────────────

#[test]
fn test_loads_list_without_config() {
    let (_dir, config) = temp_config();
    let output = wiser_cmd(&config).args(["loads", "list"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("Configuration file not found"));
}

#[test]
fn test_missing_api_key_is_auth_error() {
    let (_dir, config) = temp_config();
    wiser_cmd(&config)
        .args(["--host", "127.0.0.1:9", "loads", "list"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No API key"));
}

#[test]
fn test_invalid_state_json_is_usage_error() {
    let (_dir, config) = temp_config();
    wiser_cmd(&config)
        .args(["--host", "127.0.0.1:9", "--api-key", "k"])
        .args(["loads", "set", "1", "{bri"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid JSON payload"));
}

#[test]
fn test_unreachable_hub_is_connection_error() {
    let (_dir, config) = temp_config();
    wiser_cmd(&config)
        .args(["--host", &dead_address(), "--api-key", "k", "--timeout", "5"])
        .args(["loads", "list"])
        .assert()
        .code(7);
}

#[test]
fn test_bad_ctrl_button_is_rejected_by_parser() {
    let (_dir, config) = temp_config();
    wiser_cmd(&config)
        .args(["loads", "ctrl", "1", "--button", "sideways"])
        .assert()
        .code(2);
}

// ── Config management ───────────────────────────────────────────────

#[test]
fn test_config_path_honours_env() {
    let (_dir, config) = temp_config();
    wiser_cmd(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(config.display().to_string()));
}

#[test]
fn test_config_init_then_show_redacts_key() {
    let (_dir, config) = temp_config();
    wiser_cmd(&config)
        .args(["config", "init", "--host", "192.168.1.50", "--api-key", "s3cret"])
        .assert()
        .success();

    let written = std::fs::read_to_string(&config).unwrap();
    assert!(written.contains("192.168.1.50"));
    assert!(written.contains("default_profile = \"default\""));

    wiser_cmd(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("192.168.1.50")
                .and(predicate::str::contains("********"))
                .and(predicate::str::contains("s3cret").not()),
        );
}

#[test]
fn test_profiles_set_and_use() {
    let (_dir, config) = temp_config();
    wiser_cmd(&config)
        .args(["config", "init", "--host", "hub-a", "--api-key", "k"])
        .assert()
        .success();
    wiser_cmd(&config)
        .args(["-p", "office", "config", "init", "--host", "hub-b", "--api-key", "k"])
        .assert()
        .success();

    wiser_cmd(&config)
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default *").and(predicate::str::contains("office")));

    wiser_cmd(&config)
        .args(["config", "use", "office"])
        .assert()
        .success();
    wiser_cmd(&config)
        .args(["config", "set", "keepalive_secs", "0"])
        .assert()
        .success();

    let written = std::fs::read_to_string(&config).unwrap();
    assert!(written.contains("default_profile = \"office\""));
    assert!(written.contains("keepalive_secs = 0"));

    wiser_cmd(&config)
        .args(["config", "use", "attic"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("attic"));
}

// ── Against a mock hub ──────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_loads_list_json_from_profile() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/loads"))
        .and(header("authorization", "Bearer profile-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": [
                { "id": 1, "name": "Kitchen", "type": "dim", "device": "00012ab3", "channel": 0 },
                { "id": 2, "name": "", "type": "motor", "device": "00012ab3", "channel": 1 }
            ]
        })))
        .mount(&server)
        .await;

    let (dir, config) = temp_config();
    std::fs::write(
        &config,
        format!(
            "default_profile = \"home\"\n\n[profiles.home]\nhost = \"{}\"\napi_key = \"profile-key\"\n",
            server.address()
        ),
    )
    .unwrap();

    let output = tokio::task::spawn_blocking(move || {
        let out = wiser_cmd(&config)
            .args(["loads", "list", "-o", "json"])
            .output()
            .unwrap();
        drop(dir);
        out
    })
    .await
    .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let loads: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(loads[0]["name"], "Kitchen");
    assert_eq!(loads[1]["type"], "motor");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_loads_set_prints_echo() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/loads/4/target_state"))
        .and(body_json(json!({ "bri": 2500 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": { "id": 4, "target_state": { "bri": 2500 } }
        })))
        .mount(&server)
        .await;

    let host = server.address().to_string();
    let (dir, config) = temp_config();
    let output = tokio::task::spawn_blocking(move || {
        let out = wiser_cmd(&config)
            .args(["--host", &host, "--api-key", "k", "-o", "plain"])
            .args(["loads", "set", "4", r#"{"bri": 2500}"#])
            .output()
            .unwrap();
        drop(dir);
        out
    })
    .await
    .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "bri=2500");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_hub_error_message_is_shown() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/loads/9/ctrl"))
        .and(body_json(json!({ "button": "toggle", "event": "click" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "message": "load is locked"
        })))
        .mount(&server)
        .await;

    let host = server.address().to_string();
    let (dir, config) = temp_config();
    let output = tokio::task::spawn_blocking(move || {
        let out = wiser_cmd(&config)
            .args(["--host", &host, "--api-key", "k"])
            .args(["loads", "ctrl", "9", "--button", "toggle"])
            .output()
            .unwrap();
        drop(dir);
        out
    })
    .await
    .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("load is locked"));
}
