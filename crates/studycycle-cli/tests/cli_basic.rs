//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a temporary config directory and
//! verify outputs.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(config_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_studycycle"))
        .env("STUDYCYCLE_CONFIG_DIR", config_dir)
        .env_remove("STUDYCYCLE_LOG")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

/// Run a CLI command and expect success.
fn run_cli_success(config_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(config_dir, args);
    assert_eq!(code, 0, "CLI command failed: {args:?}\n{stderr}");
    stdout
}

#[test]
fn test_config_path_uses_override_dir() {
    let dir = tempfile::tempdir().unwrap();
    let stdout = run_cli_success(dir.path(), &["config", "path"]);
    assert_eq!(
        stdout.trim(),
        dir.path().join("config.toml").display().to_string()
    );
}

#[test]
fn test_config_get_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let stdout = run_cli_success(dir.path(), &["config", "get", "cycle.study_duration"]);
    assert_eq!(stdout.trim(), "90");
    assert!(dir.path().join("config.toml").exists());
}

#[test]
fn test_config_set_and_get() {
    let dir = tempfile::tempdir().unwrap();
    run_cli_success(dir.path(), &["config", "set", "cycle.study_duration", "45"]);
    let stdout = run_cli_success(dir.path(), &["config", "get", "cycle.study_duration"]);
    assert_eq!(stdout.trim(), "45");
}

#[test]
fn test_config_set_rejects_invalid_settings() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["config", "set", "cycle.max_alarm_interval", "200"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("exceeds the study duration"), "{stderr}");

    let stdout = run_cli_success(dir.path(), &["config", "get", "cycle.max_alarm_interval"]);
    assert_eq!(stdout.trim(), "5");
}

#[test]
fn test_config_get_unknown_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["config", "get", "cycle.nope"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_list_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    run_cli_success(dir.path(), &["config", "set", "engine.rearm", "eye_rest_end"]);

    let stdout = run_cli_success(dir.path(), &["config", "list"]);
    assert!(stdout.contains("engine.rearm = eye_rest_end"));

    run_cli_success(dir.path(), &["config", "reset"]);
    let stdout = run_cli_success(dir.path(), &["config", "list", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["engine"]["rearm"], "fixed");
}

#[test]
fn test_durations_json() {
    let dir = tempfile::tempdir().unwrap();
    let stdout = run_cli_success(dir.path(), &["durations", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["study_ms"], 5_400_000);
    assert_eq!(json["break_ms"], 1_200_000);
    assert_eq!(json["eye_rest_ms"], 20_000);
}

#[test]
fn test_durations_in_test_mode() {
    let dir = tempfile::tempdir().unwrap();
    run_cli_success(dir.path(), &["config", "set", "cycle.test_mode", "true"]);
    let stdout = run_cli_success(dir.path(), &["durations"]);
    assert!(stdout.contains("test mode"));
    assert!(stdout.contains("01:00"));
}

#[test]
fn test_simulate_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let first = run_cli_success(dir.path(), &["simulate", "--seed", "7", "--test-mode", "--json"]);
    let second = run_cli_success(dir.path(), &["simulate", "--seed", "7", "--test-mode", "--json"]);

    let a: serde_json::Value = serde_json::from_str(&first).unwrap();
    let b: serde_json::Value = serde_json::from_str(&second).unwrap();
    assert_eq!(a["events"], b["events"]);
    assert_eq!(a["metrics"]["cycle_completed"], true);
}

#[test]
fn test_simulate_text_output() {
    let dir = tempfile::tempdir().unwrap();
    let stdout = run_cli_success(dir.path(), &["simulate", "--test-mode"]);
    assert!(stdout.contains("idle -> studying"));
    assert!(stdout.contains("cycle completed"));
    assert!(stdout.contains("seed        42"));
}
