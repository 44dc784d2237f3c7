//! Integration tests for the `easysmart` CLI binary.
//!
//! These tests validate argument parsing, help output, shell completions,
//! config handling and early error paths, all without a switch on the wire.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `easysmart` binary with env isolation.
///
/// Clears all `EASYSMART_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn easysmart_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("easysmart");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env_remove("RUST_LOG")
        .env_remove("EASYSMART_PROFILE")
        .env_remove("EASYSMART_INTERFACE")
        .env_remove("EASYSMART_SOURCE_ADDRESS")
        .env_remove("EASYSMART_SWITCH_MAC")
        .env_remove("EASYSMART_OUTPUT")
        .env_remove("EASYSMART_TIMEOUT")
        .env_remove("EASYSMART_USERNAME");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn write_config(home: &Path, toml: &str) {
    let dir = home.join("easysmart");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), toml).unwrap();
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = easysmart_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    easysmart_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Easy Smart")
                .and(predicate::str::contains("apply"))
                .and(predicate::str::contains("take-ownership"))
                .and(predicate::str::contains("show")),
        );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    easysmart_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("easysmart"));
}

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    easysmart_cmd(home.path())
        .arg("reboot-everything")
        .assert()
        .failure()
        .code(2);
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    easysmart_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("easysmart"));
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    easysmart_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_is_under_config_home() {
    let home = tempfile::tempdir().unwrap();
    easysmart_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_profiles_plain() {
    let home = tempfile::tempdir().unwrap();
    write_config(
        home.path(),
        r#"
default_profile = "lab"

[profiles.lab]
interface = "eth1"
switch_mac = "50:d4:f7:3c:a6:a1"

[profiles.attic]
source_address = "10.0.0.5"
"#,
    );
    easysmart_cmd(home.path())
        .args(["config", "profiles", "-o", "plain"])
        .assert()
        .success()
        .stdout("attic\nlab\n");
}

#[test]
fn test_config_default_output_is_used_without_flag() {
    let home = tempfile::tempdir().unwrap();
    write_config(
        home.path(),
        r#"
[defaults]
output = "plain"

[profiles.lab]
interface = "eth1"

[profiles.attic]
source_address = "10.0.0.5"
"#,
    );
    easysmart_cmd(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout("attic\nlab\n");
}

#[test]
fn test_config_show_redacts_passwords() {
    let home = tempfile::tempdir().unwrap();
    write_config(
        home.path(),
        r#"
[profiles.default]
username = "admin"
password = "hunter2"
"#,
    );
    easysmart_cmd(home.path())
        .args(["config", "show", "-o", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("********").and(predicate::str::contains("hunter2").not()));
}

#[test]
fn test_unknown_profile_is_a_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let output = easysmart_cmd(home.path())
        .args(["--profile", "nope", "show"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("nope"), "Expected profile name in:\n{text}");
}

// ── Early failures (no network traffic) ─────────────────────────────

#[test]
fn test_show_without_switch_mac() {
    let home = tempfile::tempdir().unwrap();
    let output = easysmart_cmd(home.path()).arg("show").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("switch MAC"), "Expected a switch MAC hint:\n{text}");
}

#[test]
fn test_take_ownership_without_switch_ip() {
    let home = tempfile::tempdir().unwrap();
    let output = easysmart_cmd(home.path())
        .arg("take-ownership")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--switch-ip"));
}

#[test]
fn test_apply_rejects_malformed_declaration() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("switch.yml");
    std::fs::write(&file, "ports:\n  - port: 1\nvlanz: []\n").unwrap();

    let output = easysmart_cmd(home.path())
        .args(["apply", "--check"])
        .arg(&file)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("vlanz"));
}

#[test]
fn test_apply_missing_file() {
    let home = tempfile::tempdir().unwrap();
    easysmart_cmd(home.path())
        .args(["apply", "does-not-exist.yml"])
        .assert()
        .failure()
        .code(1);
}
