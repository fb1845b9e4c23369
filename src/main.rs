//! Carillon - Bell Scheduler
//!
//! CLI entry point for the bell scheduling daemon.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let (filter, invalid_level) = match EnvFilter::try_new(&cli.log) {
        Ok(filter) => (filter, false),
        Err(_) => (EnvFilter::new("info"), true),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if invalid_level {
        warn!("invalid log level {:?}, using info", cli.log);
    }
    info!("Carillon v{}", env!("CARGO_PKG_VERSION"));

    cli::run(cli).await
}
