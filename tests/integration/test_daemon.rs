#[path = "common.rs"]
mod common;

use assert_cmd::cargo::cargo_bin;
use common::TestProject;
use predicates::prelude::*;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const ADD_C: &str = "int add(int a, int b) {\n    int total = a + b;\n    return tot;\n}\n";

fn complete_add(project: &TestProject) -> String {
    let file = project.write("add.c", ADD_C);
    let output = project
        .cmd()
        .arg("ac")
        .arg(&file)
        .args(["3", "15"])
        .write_stdin(ADD_C)
        .output()
        .expect("failed to run ccode");

    assert!(output.status.success(), "ac failed: {}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8(output.stdout).expect("output is not UTF-8")
}

#[test]
fn test_autostart_and_complete_from_stdin() {
    let project = TestProject::new();
    assert!(!project.socket().exists());

    let stdout = complete_add(&project);
    assert!(stdout.starts_with("[3, ["), "unexpected output: {stdout}");
    assert!(stdout.ends_with("]]"), "unexpected output: {stdout}");
    assert!(stdout.contains("{'word':'total','abbr':'int total'}"), "unexpected output: {stdout}");
    assert!(!stdout.contains("'word':'add'"));

    assert!(project.socket().exists());
}

#[test]
fn test_complete_from_source_file_argument() {
    let project = TestProject::new();
    let file = project.write("add.c", ADD_C);

    project
        .cmd()
        .arg("complete")
        .arg(&file)
        .args(["3", "15"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("'word':'total'"));
}

#[test]
fn test_json_output() {
    let project = TestProject::new();
    let file = project.write("add.c", ADD_C);

    let output = project
        .cmd()
        .args(["ac", "--format", "json"])
        .arg(&file)
        .args(["3", "15"])
        .write_stdin(ADD_C)
        .output()
        .expect("failed to run ccode");
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("invalid JSON");
    assert_eq!(value["partial"], 3);
    assert_eq!(value["proposals"][0]["word"], "total");
}

#[test]
fn test_status_and_close() {
    let project = TestProject::new();
    complete_add(&project);

    project.cmd().arg("status").assert().success().stdout(predicate::str::starts_with("running"));

    project.cmd().arg("close").assert().success();
    // close returns only once the daemon has removed its socket
    assert!(!project.socket().exists());

    project.cmd().arg("status").assert().success().stdout("not running\n");
}

#[test]
fn test_project_flags_and_relative_paths() {
    let project = TestProject::new();
    project.write(".ccode", "-Iinclude -DFEATURE_FLAG\n");
    project.write("include/api.h", "int api_version(void);\n");
    let source = "#include <api.h>\nint main(void) {\n    return FEAT + api_;\n}\n";
    project.write("src/main.c", source);

    project
        .cmd()
        .current_dir(project.path())
        .args(["ac", "src/main.c", "3", "16"])
        .write_stdin(source)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[4, ["))
        .stdout(predicate::str::contains("'word':'FEATURE_FLAG'"));

    project
        .cmd()
        .current_dir(project.path().join("src"))
        .args(["ac", "main.c", "3", "23"])
        .write_stdin(source)
        .assert()
        .success()
        .stdout(predicate::str::contains("{'word':'api_version','abbr':'int api_version(void)'}"));
}

#[test]
fn test_repeated_completions_share_one_daemon() {
    let project = TestProject::new();
    for _ in 0..3 {
        complete_add(&project);
    }

    let pattern = project.socket().to_string_lossy().into_owned();
    if let Some(count) = common::count_processes(&pattern) {
        assert_eq!(count, 1, "expected exactly one daemon for {pattern}");
    }
}

/// Run `serve` in the foreground, deliver `signal` once the socket is up, and
/// check the daemon cleans up and exits successfully.
#[allow(unsafe_code)]
fn assert_signal_removes_socket(signal: libc::c_int) {
    let project = TestProject::new();
    let mut child = Command::new(cargo_bin!("ccode"))
        .arg("--socket")
        .arg(project.socket())
        .arg("serve")
        .env_remove("RUST_LOG")
        .env_remove("CCODE_LOG_FILE")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn ccode serve");

    let deadline = Instant::now() + Duration::from_secs(10);
    while !project.socket().exists() {
        assert!(Instant::now() < deadline, "daemon never created its socket");
        std::thread::sleep(Duration::from_millis(10));
    }

    let pid = libc::pid_t::try_from(child.id()).expect("pid out of range");
    // SAFETY: kill only sends a signal to the child we spawned above.
    let sent = unsafe { libc::kill(pid, signal) };
    assert_eq!(sent, 0, "failed to signal the daemon");

    let status = child.wait().expect("failed to wait for the daemon");
    assert!(status.success(), "daemon exited with {status}");
    assert!(!project.socket().exists());
}

#[test]
fn test_sigterm_removes_socket() {
    assert_signal_removes_socket(libc::SIGTERM);
}

#[test]
fn test_sigint_removes_socket() {
    assert_signal_removes_socket(libc::SIGINT);
}
