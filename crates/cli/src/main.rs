//! inwatch - print inotify events for a set of paths

use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod logging;
mod signals;
mod watch;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    if cli.version {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    logging::init_logging(cli.log_level)?;

    let settings = config::Settings::resolve(cli)?;
    watch::run(&settings)
}
