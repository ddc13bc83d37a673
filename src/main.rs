mod cli;
mod logging;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Parser;
use mailflow::{config::Config, thread::ConnectionId};

/// Mailbox client with optimistic actions over a live sync channel.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Config file instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Mailbox connection to join, overrides the configured one
    #[arg(short = 'n', long)]
    connection: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load_from_file(args.config).context("loading config failed")?;
    let connection = args
        .connection
        .map(ConnectionId::from)
        .or_else(|| config.connection().clone())
        .context("no connection configured, pass --connection")?;
    cli::run(&config, connection)
}
