use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CcodeError {
    #[error("Failed to bind socket: {}", path.display())]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to replace {}: not a socket", path.display())]
    NotASocket { path: PathBuf },

    #[error("A server is already running at: {}", path.display())]
    AlreadyRunning { path: PathBuf },

    #[error("Failed to start a server, can't see socket: {}", path.display())]
    StartTimeout { path: PathBuf },

    #[error("Failed to spawn the server process")]
    Spawn(#[source] std::io::Error),

    #[error("Failed to connect to a server at: {}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read source from {origin}")]
    ReadBuffer {
        origin: String,
        #[source]
        source: std::io::Error,
    },
}
