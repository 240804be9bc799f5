mod cli;
mod config;

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stylecast_core::Device;
use stylecast_model::{Runner, StyleBank, StyleRunner};
use stylecast_pool::{PoolConfig, RunnerPool};

use cli::Cli;
use config::load_config;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Device names are deduplicated and sorted before instantiation.
    let devices = cli
        .devices
        .iter()
        .map(|name| name.parse::<Device>())
        .collect::<Result<BTreeSet<Device>, _>>()?;

    let config = load_config(&cli.config)?;

    let mut runners = Vec::new();
    for device in devices {
        let mut runner = StyleRunner::new(device, config.checkpoints.clone());
        runner
            .load()
            .with_context(|| format!("failed to load runner for {device}"))?;
        runners.push(runner);
    }

    let bank = StyleBank::build(&config.styles, &runners).context("failed to build style cache")?;
    info!(
        styles = bank.len(),
        runners = runners.len(),
        "startup complete"
    );

    let runners: Vec<Box<dyn Runner>> = runners
        .into_iter()
        .map(|runner| Box::new(runner) as Box<dyn Runner>)
        .collect();
    let pool = RunnerPool::start(runners, PoolConfig::default())?;
    info!("serving; press ctrl-c to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutting down");
    pool.shutdown()?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
