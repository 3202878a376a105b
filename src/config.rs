//! Daemon configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Base name of the daemon socket.
pub const DAEMON_NAME: &str = "ccode-server";

/// Default length of one idle interval in seconds.
pub const DEFAULT_IDLE_INTERVAL_SECS: u64 = 60;

/// Default number of consecutive idle intervals before the daemon exits.
pub const DEFAULT_IDLE_LIMIT: u32 = 15;

/// Everything the daemon needs to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Unix socket the daemon listens on
    pub socket_path: PathBuf,
    /// How long one accept wait lasts before it counts as idle
    pub idle_interval: Duration,
    /// Consecutive idle intervals that trigger shutdown
    pub idle_limit: u32,
}

impl DaemonConfig {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self { socket_path: socket_path.into(), ..Self::default() }
    }

    #[must_use]
    pub const fn with_idle(mut self, interval: Duration, limit: u32) -> Self {
        self.idle_interval = interval;
        self.idle_limit = limit;
        self
    }

    /// Total time without connections before the daemon exits.
    pub fn idle_shutdown_after(&self) -> Duration {
        self.idle_interval * self.idle_limit
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            idle_interval: Duration::from_secs(DEFAULT_IDLE_INTERVAL_SECS),
            idle_limit: DEFAULT_IDLE_LIMIT,
        }
    }
}

/// `<tmp>/ccode-server.<user>`, or `<tmp>/ccode-server` without a user.
pub fn default_socket_path() -> PathBuf {
    let user = std::env::var("USER").ok();
    socket_path_for(&std::env::temp_dir(), user.as_deref())
}

pub fn socket_path_for(tmp_dir: &Path, user: Option<&str>) -> PathBuf {
    match user.filter(|user| !user.is_empty()) {
        Some(user) => tmp_dir.join(format!("{DAEMON_NAME}.{user}")),
        None => tmp_dir.join(DAEMON_NAME),
    }
}
