//! The completion daemon and the client that talks to it.
//!
//! The daemon keeps a parsed view of the file being edited warm between
//! requests; the client is a short-lived process per request that autostarts
//! the daemon on first use.

pub mod client;
pub mod protocol;
pub mod server;
pub mod session;

pub use client::{connect_or_start, DaemonClient};
pub use protocol::CompletionRequest;
pub use server::DaemonServer;
