//! Command-line arguments

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Print inotify events for the given paths until interrupted
#[derive(Debug, Parser)]
#[command(name = "inwatch")]
#[command(author, about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Print version and exit
    #[arg(short = 'v', long)]
    pub version: bool,

    /// Events to watch, e.g. "CREATE|DELETE" or "IN_MODIFY,IN_ATTRIB" [default: ALL_EVENTS]
    #[arg(short, long)]
    pub mask: Option<String>,

    /// Events that end the watch with an error [default: Q_OVERFLOW|UNMOUNT]
    #[arg(short, long)]
    pub terminal: Option<String>,

    /// Exit successfully when no event arrives for this many milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Exit successfully after printing this many events
    #[arg(short = 'n', long)]
    pub max_events: Option<u64>,

    /// TOML file with defaults for any of the options above
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log verbosity (overrides INWATCH_LOG)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Paths to watch
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}
