//! Command line surface and daemon wiring

use anyhow::Result;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use carillon_audio::BellPlayer;
use carillon_core::{Clock, CronExpr, Job, Reconciler, Scheduler, TimeSync};

/// Rings a bell on a live-editable cron schedule.
#[derive(Parser, Debug)]
#[command(name = "carillon", version, about)]
pub struct Cli {
    /// Path to the bell sound file (WAV)
    #[arg(long = "bell", value_name = "PATH")]
    pub bell: PathBuf,

    /// Path to the cron schedule file
    #[arg(long = "cron", value_name = "PATH")]
    pub cron: PathBuf,

    /// Log verbosity (trace, debug, info, warn, error)
    #[arg(long = "log", default_value = "info")]
    pub log: String,

    /// Number of times to play the bell sound per ring
    #[arg(long = "loops", default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub loops: u32,

    /// Seconds between schedule file re-checks
    #[arg(long = "recheck-secs", default_value_t = 60)]
    pub recheck_secs: u32,

    /// Seconds between time source synchronizations
    #[arg(long = "sync-secs", default_value_t = 3600)]
    pub sync_secs: u32,

    /// NTP time source address
    #[arg(long = "time-source", default_value = "time.nist.gov:123")]
    pub time_source: String,
}

/// Reject a configuration value with usage guidance, before any
/// scheduling starts.
fn config_error(message: String) -> ! {
    Cli::command()
        .error(clap::error::ErrorKind::ValueValidation, message)
        .exit()
}

/// Validate the configuration, wire the components together and run
/// the scheduler until Ctrl-C.
pub async fn run(cli: Cli) -> Result<()> {
    if !cli.bell.exists() {
        config_error(format!("bell sound file does not exist: {:?}", cli.bell));
    }
    if !cli.cron.exists() {
        config_error(format!("cron file does not exist: {:?}", cli.cron));
    }
    let recheck_expr = CronExpr::every(cli.recheck_secs).unwrap_or_else(|| {
        config_error(format!(
            "re-check interval of {}s is not expressible as a cron step",
            cli.recheck_secs
        ))
    });
    let sync_expr = CronExpr::every(cli.sync_secs).unwrap_or_else(|| {
        config_error(format!(
            "time sync interval of {}s is not expressible as a cron step",
            cli.sync_secs
        ))
    });

    let clock = Arc::new(Clock::new());
    let scheduler = Arc::new(Scheduler::new(clock));

    let player = Arc::new(BellPlayer::new(&cli.bell, cli.loops));
    let bell_job: Job = Arc::new(move || {
        info!("Playing bell");
        if let Err(e) = player.ring() {
            error!("bell playback failed - {}", e);
        }
    });

    // The scheduler runs its own maintenance: schedule re-checks and
    // time sync are plain entries on the same loop they serve.
    let reconciler = Arc::new(Reconciler::new(
        &cli.cron,
        Arc::clone(&scheduler),
        bell_job,
    ));
    // First pass up front so the initial schedule does not wait a full
    // re-check interval.
    reconciler.reconcile();
    scheduler.add_fn(recheck_expr, reconciler.as_job());

    let timesync = Arc::new(TimeSync::new(cli.time_source, Arc::clone(&scheduler)));
    scheduler.add_fn(sync_expr, timesync.as_job());

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
                shutdown.cancel();
            }
        });
    }

    scheduler.run(shutdown).await;
    Ok(())
}
