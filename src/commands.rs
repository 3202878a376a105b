use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use crate::cli::args::{Cli, Commands, OutputFormat};
use crate::cli::output::OutputFormatter;
use crate::config::{default_socket_path, DaemonConfig};
use crate::daemon::{connect_or_start, CompletionRequest, DaemonClient, DaemonServer};
use crate::engine::c::CEngine;
use crate::utils::CcodeError;

pub async fn run(cli: Cli) -> Result<()> {
    let socket_path = cli.socket.unwrap_or_else(default_socket_path);

    match cli.command {
        Commands::Close => handle_close_command(&socket_path).await,
        Commands::Ac { file, line, column, source, format } => {
            handle_complete_command(&socket_path, &file, line, column, source.as_deref(), format)
                .await
        }
        Commands::Serve { idle_interval_secs, idle_limit, log_file: _ } => {
            let config = DaemonConfig::new(socket_path)
                .with_idle(Duration::from_secs(idle_interval_secs), idle_limit);
            handle_serve_command(config).await
        }
        Commands::Status => {
            handle_status_command(&socket_path);
            Ok(())
        }
    }
}

/// Stop the daemon if one is running. Never starts one.
pub async fn handle_close_command(socket_path: &Path) -> Result<()> {
    if !socket_path.exists() {
        tracing::info!("No daemon running at {}", socket_path.display());
        return Ok(());
    }

    match DaemonClient::connect(socket_path).await {
        Ok(client) => client.close().await,
        Err(err) => {
            // a socket file nobody listens on; the next daemon replaces it
            tracing::info!("Daemon at {} is not answering: {err:#}", socket_path.display());
            Ok(())
        }
    }
}

pub async fn handle_complete_command(
    socket_path: &Path,
    file: &Path,
    line: i32,
    column: i32,
    source: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let buffer = read_buffer(source)?;
    let filename = std::path::absolute(file)
        .with_context(|| format!("Failed to resolve path {}", file.display()))?;

    let request = CompletionRequest {
        buffer,
        filename: filename.to_string_lossy().into_owned(),
        line,
        column,
    };

    let client = connect_or_start(socket_path).await?;
    let response = client.complete(&request).await?;

    let mut stdout = std::io::stdout().lock();
    write!(stdout, "{}", OutputFormatter::new(format).format_completion(&response))?;
    stdout.flush()?;

    Ok(())
}

pub async fn handle_serve_command(config: DaemonConfig) -> Result<()> {
    let engine = CEngine::new()?;
    DaemonServer::new(config, engine).start().await
}

pub fn handle_status_command(socket_path: &Path) {
    if std::os::unix::net::UnixStream::connect(socket_path).is_ok() {
        println!("running ({})", socket_path.display());
    } else {
        println!("not running");
    }
}

/// The edited buffer: from `source` if given, stdin otherwise.
fn read_buffer(source: Option<&Path>) -> Result<Vec<u8>> {
    let read = match source {
        Some(path) => std::fs::read(path).map_err(|err| (path.display().to_string(), err)),
        None => {
            let mut buffer = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buffer)
                .map(|_| buffer)
                .map_err(|err| ("stdin".to_string(), err))
        }
    };

    read.map_err(|(origin, source)| CcodeError::ReadBuffer { origin, source }.into())
}
