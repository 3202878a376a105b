//! Daemon server: socket ownership and the connection dispatch loop.
//!
//! The server binds its Unix socket, then handles one connection at a time
//! until a client asks it to close, no client shows up for `idle_limit`
//! consecutive intervals, or SIGINT/SIGTERM arrives. On every one of those
//! paths the cached parse is disposed, the listener is closed and the socket
//! file is removed exactly once by [`SocketGuard`].

use anyhow::{Context, Result};
use std::future::Future;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tokio::net::{UnixListener, UnixStream};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::timeout;

use crate::config::DaemonConfig;
use crate::daemon::protocol::{self, ProtocolError, Request};
use crate::daemon::session::CompletionSession;
use crate::engine::CompletionEngine;
use crate::utils::CcodeError;

/// Removes the socket file when dropped.
#[derive(Debug)]
pub struct SocketGuard {
    path: PathBuf,
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed socket {}", self.path.display()),
            Err(err) => tracing::warn!("Failed to remove socket {}: {err}", self.path.display()),
        }
    }
}

/// Bind the daemon socket at `path`.
///
/// A socket file somebody still accepts on means another daemon owns the
/// path. A socket file nobody answers on is left over from a crash and is
/// replaced. Anything that is not a socket is left alone.
pub fn bind_socket(path: &Path) -> Result<(UnixListener, SocketGuard)> {
    match std::fs::symlink_metadata(path) {
        Ok(metadata) if !metadata.file_type().is_socket() => {
            return Err(CcodeError::NotASocket { path: path.to_path_buf() }.into());
        }
        Ok(_) => {
            if std::os::unix::net::UnixStream::connect(path).is_ok() {
                return Err(CcodeError::AlreadyRunning { path: path.to_path_buf() }.into());
            }
            tracing::info!("Removing stale socket {}", path.display());
            std::fs::remove_file(path)
                .map_err(|source| CcodeError::Bind { path: path.to_path_buf(), source })?;
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => return Err(CcodeError::Bind { path: path.to_path_buf(), source }.into()),
    }

    let listener = UnixListener::bind(path)
        .map_err(|source| CcodeError::Bind { path: path.to_path_buf(), source })?;
    let guard = SocketGuard { path: path.to_path_buf() };

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .context("Failed to set socket permissions")?;

    Ok((listener, guard))
}

/// Why the dispatch loop stopped.
#[derive(Debug)]
enum StopReason {
    /// A client sent `Close`; its connection is held until cleanup is done
    CloseRequested(UnixStream),
    IdleTimeout,
    Signal,
}

enum Flow {
    Continue,
    Close(UnixStream),
}

/// The completion daemon.
pub struct DaemonServer<E: CompletionEngine> {
    config: DaemonConfig,
    session: CompletionSession<E>,
}

impl<E: CompletionEngine> DaemonServer<E> {
    pub fn new(config: DaemonConfig, engine: E) -> Self {
        Self { config, session: CompletionSession::new(engine) }
    }

    /// Run until closed, idle or interrupted by SIGINT/SIGTERM.
    pub async fn start(self) -> Result<()> {
        let mut interrupt =
            signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

        let shutdown = async move {
            tokio::select! {
                _ = interrupt.recv() => tracing::info!("Received SIGINT"),
                _ = terminate.recv() => tracing::info!("Received SIGTERM"),
            }
        };

        self.run(shutdown).await
    }

    /// Bind, serve until a stop condition (or `shutdown` resolves), clean up.
    pub async fn run<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (listener, guard) = bind_socket(&self.config.socket_path)?;
        tracing::info!(
            "Listening on {} (idle shutdown after {:?})",
            self.config.socket_path.display(),
            self.config.idle_shutdown_after()
        );

        let stopped = self.serve(&listener, shutdown).await;

        self.session.dispose();
        drop(listener);
        drop(guard);

        match stopped? {
            StopReason::CloseRequested(stream) => {
                tracing::info!("Shut down on client request");
                // closing the stream is the acknowledgement
                drop(stream);
            }
            StopReason::IdleTimeout => tracing::info!("Shut down after being idle"),
            StopReason::Signal => tracing::info!("Shut down on signal"),
        }

        Ok(())
    }

    async fn serve<F>(&mut self, listener: &UnixListener, shutdown: F) -> Result<StopReason>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut idle_intervals = 0u32;

        loop {
            tokio::select! {
                () = &mut shutdown => return Ok(StopReason::Signal),

                accepted = timeout(self.config.idle_interval, listener.accept()) => {
                    match accepted {
                        Err(_) => {
                            idle_intervals += 1;
                            tracing::debug!("Idle interval {idle_intervals}/{}", self.config.idle_limit);
                            if idle_intervals >= self.config.idle_limit {
                                return Ok(StopReason::IdleTimeout);
                            }
                        }
                        Ok(Err(err)) => return Err(err).context("Failed to accept a connection"),
                        Ok(Ok((stream, _addr))) => {
                            idle_intervals = 0;
                            // a signal must still get through while a client is slow
                            tokio::select! {
                                () = &mut shutdown => return Ok(StopReason::Signal),
                                flow = self.handle_connection(stream) => {
                                    if let Flow::Close(stream) = flow {
                                        return Ok(StopReason::CloseRequested(stream));
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// Serve exactly one request on `stream`.
    ///
    /// A request that does not arrive within one idle interval drops the
    /// connection.
    async fn handle_connection(&mut self, mut stream: UnixStream) -> Flow {
        let read = timeout(self.config.idle_interval, protocol::read_request(&mut stream));
        let Ok(request) = read.await else {
            tracing::warn!(
                "Dropping connection: no complete request within {:?}",
                self.config.idle_interval
            );
            return Flow::Continue;
        };

        match request {
            Ok(Request::Close) => {
                tracing::info!("Close requested");
                Flow::Close(stream)
            }
            Ok(Request::Completion(request)) => {
                let response = self.session.complete(&request);
                if let Err(err) = protocol::send_completion_response(&mut stream, &response).await {
                    tracing::warn!("Failed to send completion response: {err}");
                }
                Flow::Continue
            }
            Err(ProtocolError::Disconnected) => {
                tracing::debug!("Client disconnected without a request");
                Flow::Continue
            }
            Err(err) => {
                tracing::warn!("Dropping connection: {err}");
                Flow::Continue
            }
        }
    }
}
