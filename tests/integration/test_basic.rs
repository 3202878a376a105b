#[path = "common.rs"]
mod common;

use common::TestProject;
use predicates::prelude::*;

#[test]
fn test_help() {
    let project = TestProject::new();
    project
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Code completion for C"))
        .stdout(predicate::str::contains("close"))
        .stdout(predicate::str::contains("ac"));
}

#[test]
fn test_version() {
    let project = TestProject::new();
    project.cmd().arg("--version").assert().success().stdout(predicate::str::starts_with("ccode"));
}

#[test]
fn test_missing_subcommand_exits_1() {
    let project = TestProject::new();
    project.cmd().assert().code(1);
}

#[test]
fn test_bad_position_exits_1() {
    let project = TestProject::new();
    project
        .cmd()
        .args(["ac", "main.c", "first", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid value"));

    project.cmd().args(["ac", "main.c", "0", "1"]).assert().code(1);
    project.cmd().args(["ac", "main.c", "1"]).assert().code(1);
    assert!(!project.socket().exists());
}

#[test]
fn test_status_without_daemon() {
    let project = TestProject::new();
    project.cmd().arg("status").assert().success().stdout("not running\n");
}

#[test]
fn test_close_without_daemon_does_not_start_one() {
    let project = TestProject::new();
    project.cmd().arg("close").assert().success().stdout("");
    assert!(!project.socket().exists());
}

#[test]
fn test_unreadable_source_exits_1() {
    let project = TestProject::new();
    let missing = project.path().join("missing.c");

    project
        .cmd()
        .arg("ac")
        .arg(&missing)
        .args(["1", "1"])
        .arg(&missing)
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("error: Failed to read source from"));

    // the buffer is read before any daemon is started
    assert!(!project.socket().exists());
}
