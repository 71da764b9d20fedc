// ABOUTME: Integration tests for the dregs CLI commands.
// ABOUTME: Validates --help output, init behavior, and argument errors.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn dregs_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("dregs"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_shows_commands() {
    dregs_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("images"))
        .stdout(predicate::str::contains("containers"))
        .stdout(predicate::str::contains("clean"))
        .stdout(predicate::str::contains("menu"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("dregs.yml");

    dregs_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("dregs.yml"));

    assert!(config_path.exists(), "dregs.yml should be created");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("engine:"), "Config should have engine section");
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("dregs.yml");

    fs::write(&config_path, "existing: config").unwrap();

    dregs_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&config_path).unwrap(), "existing: config");
}

#[test]
fn init_force_overwrites_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("dregs.yml");

    fs::write(&config_path, "existing: config").unwrap();

    dregs_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--force"])
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("command_timeout"));
}

#[test]
fn missing_explicit_config_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    dregs_cmd()
        .current_dir(temp_dir.path())
        .args(["--config", "nowhere.yml", "images"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere.yml"));
}

#[test]
fn invalid_config_fails_before_connecting() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("dregs.yml"), "colour: blue\n").unwrap();

    dregs_cmd()
        .current_dir(temp_dir.path())
        .arg("info")
        .assert()
        .failure()
        .stderr(predicate::str::contains("colour"));
}

#[test]
fn malformed_host_flag_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    dregs_cmd()
        .current_dir(temp_dir.path())
        .args(["--host", "deploy@", "images"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("hostname cannot be empty"));
}

#[test]
fn clean_rejects_malformed_reference_before_connecting() {
    let temp_dir = tempfile::tempdir().unwrap();

    dregs_cmd()
        .current_dir(temp_dir.path())
        .args(["--no", "clean", "web:1", "abc;rm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid image reference 'abc;rm'"))
        .stderr(predicate::str::contains("';'"));
}

#[test]
fn yes_and_no_conflict() {
    dregs_cmd()
        .args(["--yes", "--no", "clean"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn clean_all_conflicts_with_ids() {
    dregs_cmd()
        .args(["clean", "--all", "abc123"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
