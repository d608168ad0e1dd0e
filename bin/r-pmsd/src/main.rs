//! ---
//! pms_section: "01-core-functionality"
//! pms_subsection: "binary"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Binary entrypoint for the R-PMS station daemon."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use r_pms_common::config::AppConfig;
use r_pms_common::logging::init_tracing;
use r_pms_substrate::Station;
use tokio::signal;
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, version, about = "R-PMS station daemon", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "SECONDS", help = "Override the simulation tick interval")]
    tick_interval: Option<u64>,

    #[arg(long, value_name = "SEED", help = "Override the simulation random seed")]
    seed: Option<u64>,

    #[arg(long, help = "Disable the browse service, as on probe-only deployments")]
    no_browse: bool,

    #[arg(long, help = "Serve the address space without the sensor simulation")]
    no_simulation: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/example.prod.toml"));
    candidates.push(PathBuf::from("configs/example.dev.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    if let Some(seconds) = cli.tick_interval {
        config.simulation.tick_interval = std::time::Duration::from_secs(seconds);
    }
    if let Some(seed) = cli.seed {
        config.simulation.random_seed = seed;
    }
    init_tracing("r-pmsd", &config.logging)?;
    info!(config_path = %loaded.source.display(), "configuration loaded");

    let station = if cli.no_browse {
        Station::build_without_browse(config)?
    } else {
        Station::build(config)?
    };
    info!(
        station = %station.config().station.id,
        name = %station.config().station.name,
        modules = station.modules().len(),
        nodes = station.node_count(),
        "station serving"
    );

    let simulation = if cli.no_simulation {
        info!("sensor simulation disabled by flag");
        None
    } else {
        Some(station.spawn_simulation())
    };

    signal::ctrl_c().await?;
    info!("ctrl-c received; shutting down");
    if let Some(handle) = simulation {
        handle.shutdown().await;
    }
    Ok(())
}
