#[cfg(not(unix))]
compile_error!("ccode talks over Unix domain sockets and only builds on Unix");

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod completion;
mod config;
mod daemon;
mod engine;
mod project;
mod utils;

use cli::args::{Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };

    let log_file = match &cli.command {
        Commands::Serve { log_file, .. } => log_file.clone(),
        _ => None,
    };
    if let Err(err) = init_tracing(cli.verbose, log_file.as_deref()) {
        eprintln!("error: {err:#}");
        return ExitCode::FAILURE;
    }

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!("{err:?}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logging is off unless asked for with `-v`, `RUST_LOG` or a log file.
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("ccode=debug")
    } else if let Ok(filter) = EnvFilter::try_from_default_env() {
        filter
    } else if log_file.is_some() {
        EnvFilter::new("ccode=info")
    } else {
        return Ok(());
    };

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            subscriber.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => subscriber.with_writer(std::io::stderr).init(),
    }

    Ok(())
}
