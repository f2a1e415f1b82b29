use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("targetdeck").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Collection tasking orchestrator"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("target"))
        .stdout(predicate::str::contains("sweep"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("targetdeck").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("targetdeck"));
}

#[test]
fn test_cli_target_help() {
    let mut cmd = Command::cargo_bin("targetdeck").unwrap();
    cmd.args(["target", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("add"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("close"));
}

#[test]
fn test_uninitialized_directory_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("targetdeck").unwrap();
    cmd.current_dir(dir.path())
        .args(["status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn test_init_then_sweep_runs_clean() {
    let dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("targetdeck")
        .unwrap()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();
    assert!(dir.path().join(".deck/config.toml").exists());

    Command::cargo_bin("targetdeck")
        .unwrap()
        .current_dir(dir.path())
        .args(["target", "add", "Northlight Podcast", "--priority", "1"])
        .assert()
        .success();

    Command::cargo_bin("targetdeck")
        .unwrap()
        .current_dir(dir.path())
        .args(["--output", "json", "sweep"])
        .assert()
        .success()
        .stdout(predicate::str::contains("packages_created"));
}
