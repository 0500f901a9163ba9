use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn ghrunner() -> Command {
    let mut cmd = Command::cargo_bin("ghrunner").unwrap();
    cmd.env_remove("ROOT_RUNNERS_DIR")
        .env_remove("LOG_LEVEL")
        .env_remove("GITHUB_TOKEN");
    cmd
}

#[test]
fn print_debug_info() {
    ghrunner()
        .args(["start", "--root-dir", "/opt/runners", "--print-debug-info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Printing debug info"))
        .stdout(predicate::str::contains("/opt/runners"));
}

#[test]
fn debug_info_hides_the_token() {
    ghrunner()
        .args(["setup", "--orgs", "acme", "--print-debug-info"])
        .env("GITHUB_TOKEN", "ghp_not_so_secret")
        .assert()
        .success()
        .stdout(predicate::str::contains("ghp_not_so_secret").not());
}

#[test]
fn start_without_runners_fails() {
    let root = tempfile::tempdir().unwrap();

    ghrunner()
        .arg("start")
        .arg("--root-dir")
        .arg(root.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Found 0 runners"));
}

#[test]
fn start_reads_root_from_environment() {
    let root = tempfile::tempdir().unwrap();

    ghrunner()
        .arg("start")
        .env("ROOT_RUNNERS_DIR", root.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Found 0 runners"));
}

#[test]
fn start_with_missing_root_fails() {
    let root = tempfile::tempdir().unwrap();

    ghrunner()
        .arg("start")
        .arg("--root-dir")
        .arg(root.path().join("missing"))
        .assert()
        .code(1);
}

#[test]
fn invalid_config_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.yaml");
    fs::write(&config, "log:\n  level: chatty\n").unwrap();

    ghrunner()
        .arg("--config")
        .arg(&config)
        .args(["start", "--root-dir"])
        .arg(dir.path())
        .assert()
        .code(78)
        .stderr(predicate::str::contains("failed to load configuration"));
}

#[test]
fn setup_requires_a_token() {
    ghrunner()
        .args(["setup", "--orgs", "acme"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--github-token"));
}
