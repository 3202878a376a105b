#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch project directory with its own daemon socket.
///
/// Every test gets a private socket so tests never share a daemon; any daemon
/// a test started is closed when this is dropped.
pub struct TestProject {
    dir: TempDir,
    socket: PathBuf,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let socket = dir.path().join("ccode.sock");
        Self { dir, socket }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Write `contents` to `name` inside the project, creating parent dirs.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create dirs");
        }
        std::fs::write(&path, contents).expect("failed to write file");
        path
    }

    /// `ccode` pointed at this project's socket, with logging off.
    pub fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("ccode");
        cmd.env("CCODE_SOCKET", &self.socket)
            .env_remove("RUST_LOG")
            .env_remove("CCODE_LOG_FILE");
        cmd
    }
}

impl Drop for TestProject {
    fn drop(&mut self) {
        if self.socket.exists() {
            let _ = self.cmd().arg("close").output();
        }
    }
}

/// Count running processes whose command line mentions `pattern`.
///
/// Returns `None` when `pgrep` is not available.
pub fn count_processes(pattern: &str) -> Option<usize> {
    let output = std::process::Command::new("pgrep").arg("-f").arg(pattern).output().ok()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    Some(stdout.lines().filter(|l| !l.trim().is_empty()).count())
}
