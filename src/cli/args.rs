use clap::builder::styling::{AnsiColor, Styles};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::{DEFAULT_IDLE_INTERVAL_SECS, DEFAULT_IDLE_LIMIT};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().bold())
    .literal(AnsiColor::Cyan.on_default().bold())
    .placeholder(AnsiColor::Cyan.on_default())
    .error(AnsiColor::Red.on_default().bold());

const AFTER_HELP: &str = "\x1b[1;32mQuick Reference:\x1b[0m
  \x1b[1;36mComplete at a cursor\x1b[0m (the daemon starts on first use):
    ccode ac main.c 12 8 < main.c       Buffer from stdin
    ccode ac main.c 12 8 main.c         Buffer from a file

  \x1b[1;36mManage the daemon:\x1b[0m
    ccode status                        Is a daemon listening?
    ccode close                         Stop it

  \x1b[1;36mPer-project flags:\x1b[0m
    echo '-Iinclude -DDEBUG' > .ccode   Picked up for every file below that directory";

#[derive(Parser)]
#[command(name = "ccode")]
#[command(about = "Code completion for C, served by a background daemon")]
#[command(version)]
#[command(styles = STYLES)]
#[command(after_help = AFTER_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Daemon socket (defaults to <tmp>/ccode-server.<user>)
    #[arg(long, global = true, value_name = "PATH", env = "CCODE_SOCKET")]
    pub socket: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stop the running daemon
    Close,

    /// Complete at a cursor position
    #[command(
        visible_alias = "complete",
        long_about = "Complete at a cursor position. The buffer is read from SOURCE if given, \
        otherwise from stdin, so unsaved editor contents can be completed.\n\n\
        Examples:\n  \
        ccode ac src/main.c 12 8 < src/main.c\n  \
        ccode ac --format json src/main.c 12 8 src/main.c"
    )]
    Ac {
        /// File being edited
        file: PathBuf,

        /// Cursor line (1-based)
        #[arg(value_parser = clap::value_parser!(i32).range(1..))]
        line: i32,

        /// Cursor column (1-based, 1 = before the first character)
        #[arg(value_parser = clap::value_parser!(i32).range(1..))]
        column: i32,

        /// Read the buffer from this file instead of stdin
        source: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Vim)]
        format: OutputFormat,
    },

    /// Run the daemon in the foreground (spawned automatically by `ac`)
    Serve {
        /// Length of one idle interval in seconds
        #[arg(
            long,
            value_name = "SECONDS",
            default_value_t = DEFAULT_IDLE_INTERVAL_SECS,
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        idle_interval_secs: u64,

        /// Consecutive idle intervals before the daemon exits
        #[arg(
            long,
            value_name = "COUNT",
            default_value_t = DEFAULT_IDLE_LIMIT,
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        idle_limit: u32,

        /// Append logs to this file instead of stderr
        #[arg(long, value_name = "FILE", env = "CCODE_LOG_FILE")]
        log_file: Option<PathBuf>,
    },

    /// Report whether a daemon is listening
    Status,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Vim dictionary list: [partial, [{'word':..,'abbr':..}, ...]]
    #[default]
    Vim,
    Json,
}
