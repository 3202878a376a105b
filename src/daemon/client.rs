//! Client side of the daemon: connecting, autostart and the two requests.
//!
//! The socket file is the only coordination signal between processes. If it
//! is missing the client spawns a detached daemon and polls for the file to
//! appear; once it exists the client connects, and a failure at that point is
//! reported separately from a startup timeout.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::UnixStream;

use super::protocol::{self, CompletionRequest, CompletionResponse};
use crate::utils::CcodeError;

/// Delay between checks for the socket after spawning the daemon.
pub const STARTUP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Checks before giving up on a freshly spawned daemon (about one second).
pub const STARTUP_POLL_ATTEMPTS: u32 = 100;

/// One connection to the daemon. Each connection carries a single request.
pub struct DaemonClient {
    socket_path: PathBuf,
    stream: UnixStream,
}

impl DaemonClient {
    /// Connect to a daemon that is expected to be running.
    pub async fn connect(socket_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket_path)
            .await
            .map_err(|source| CcodeError::Connect { path: socket_path.to_path_buf(), source })?;

        tracing::debug!("Connected to daemon at {}", socket_path.display());

        Ok(Self { socket_path: socket_path.to_path_buf(), stream })
    }

    /// Ask the daemon to exit and wait until it has cleaned up.
    ///
    /// The daemon closes this connection only after its socket file is gone,
    /// so seeing end-of-stream means shutdown is complete.
    pub async fn close(mut self) -> Result<()> {
        protocol::send_close(&mut self.stream).await.context("Failed to send close request")?;

        let mut rest = Vec::new();
        self.stream
            .read_to_end(&mut rest)
            .await
            .context("Failed waiting for the daemon to close")?;

        tracing::info!("Daemon at {} closed", self.socket_path.display());
        Ok(())
    }

    /// Send one completion request and read the response.
    pub async fn complete(mut self, request: &CompletionRequest) -> Result<CompletionResponse> {
        protocol::send_completion_request(&mut self.stream, request)
            .await
            .context("Failed to send completion request")?;

        let response = protocol::read_completion_response(&mut self.stream)
            .await
            .context("Failed to read completion response")?;

        tracing::debug!("Received {} proposal(s)", response.proposals.len());
        Ok(response)
    }
}

/// Connect to the daemon at `socket_path`, starting one first if needed.
pub async fn connect_or_start(socket_path: &Path) -> Result<DaemonClient> {
    ensure_daemon_running(socket_path).await?;
    DaemonClient::connect(socket_path).await
}

/// Make sure a daemon socket exists at `socket_path`, spawning a daemon if not.
///
/// Only the file's existence is checked; whether it answers is for
/// [`DaemonClient::connect`] to find out.
pub async fn ensure_daemon_running(socket_path: &Path) -> Result<()> {
    if socket_path.exists() {
        tracing::debug!("Daemon socket present at {}", socket_path.display());
        return Ok(());
    }

    tracing::info!("Starting daemon at {}", socket_path.display());
    spawn_daemon(socket_path)?;
    wait_for_socket(socket_path, STARTUP_POLL_INTERVAL, STARTUP_POLL_ATTEMPTS).await
}

/// Poll for `socket_path` to appear.
pub async fn wait_for_socket(socket_path: &Path, interval: Duration, attempts: u32) -> Result<()> {
    for attempt in 1..=attempts {
        tokio::time::sleep(interval).await;

        if socket_path.exists() {
            tracing::debug!("Daemon socket appeared after {attempt} check(s)");
            return Ok(());
        }
    }

    Err(CcodeError::StartTimeout { path: socket_path.to_path_buf() }.into())
}

/// Spawn `ccode --socket <path> serve` as a detached background process.
///
/// The child gets its own session (no controlling terminal), null standard
/// streams and `/` as its working directory.
#[allow(unsafe_code)]
pub fn spawn_daemon(socket_path: &Path) -> Result<()> {
    use std::os::unix::process::CommandExt;
    use std::process::{Command, Stdio};

    let exe = std::env::current_exe().context("Failed to get current executable path")?;
    let socket_path = std::path::absolute(socket_path).map_err(CcodeError::Spawn)?;

    let mut command = Command::new(exe);
    command
        .arg("--socket")
        .arg(&socket_path)
        .arg("serve")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .current_dir("/");

    // SAFETY: setsid is async-signal-safe and touches no memory of the parent.
    unsafe {
        command.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let child = command.spawn().map_err(CcodeError::Spawn)?;
    tracing::debug!("Spawned daemon process with PID {}", child.id());

    Ok(())
}
