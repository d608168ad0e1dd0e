//! ---
//! pms_section: "06-client"
//! pms_subsection: "binary"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Binary entrypoint for the R-PMS monitoring console."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use r_pms_client::{station_identity, ClientSession, Discoverer, MethodInvoker};
use r_pms_common::config::AppConfig;
use r_pms_common::logging::init_tracing;
use r_pms_substrate::{RemoteSubstrate, Station, Substrate};
use tokio::signal;
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, version, about = "R-PMS monitoring console", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "URL",
        help = "Connect to a remote station instead of embedding one"
    )]
    endpoint: Option<String>,

    #[arg(long, help = "Embed a station with browsing disabled to force probing")]
    probe_only: bool,

    #[arg(long, help = "Skip the alarm method exercising pass")]
    no_methods: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/example.dev.toml"));
    candidates.push(PathBuf::from("configs/example.prod.toml"));

    let config = AppConfig::load(&candidates).unwrap_or_else(|_| AppConfig::default());
    init_tracing("r-pms-console", &config.logging)?;

    if let Some(endpoint) = &cli.endpoint {
        let substrate = RemoteSubstrate::new(endpoint.clone());
        run(substrate, &config, &cli).await
    } else {
        // Embedded mode: host the station in this process and monitor it
        // through the same substrate surface a networked console would use.
        let station = if cli.probe_only {
            Station::build_without_browse(config.clone())?
        } else {
            Station::build(config.clone())?
        };
        let simulation = station.spawn_simulation();
        let outcome = run(station.substrate(), &config, &cli).await;
        simulation.shutdown().await;
        outcome
    }
}

async fn run(substrate: impl Substrate, config: &AppConfig, cli: &Cli) -> Result<()> {
    let session = ClientSession::new(substrate);
    session.open().await?;

    let (station_id, station_name) = station_identity(session.substrate(), &config.client).await?;
    info!(%station_id, %station_name, "connected to station");

    let catalog = Discoverer::new(session.substrate(), &config.client)
        .run()
        .await?;
    for node in catalog.nodes() {
        info!(
            node = %node.node_id,
            class = ?node.node_class,
            name = %node.display_name,
            "discovered"
        );
    }

    let watches = r_pms_client::watch_variables(
        session.substrate(),
        &catalog.variables().cloned().collect::<Vec<_>>(),
        &config.client,
    )
    .await?;

    if cli.no_methods {
        info!("method exercising skipped by flag");
    } else {
        let outcomes = MethodInvoker::new(session.substrate(), &config.client)
            .exercise(&catalog)
            .await?;
        for outcome in &outcomes {
            info!(
                method = %outcome.method_name,
                object = %outcome.object_id,
                status = %outcome.status,
                "method exercised"
            );
        }
    }

    info!("console running; press ctrl-c to stop");
    signal::ctrl_c().await?;
    info!("ctrl-c received; tearing down");
    session.shutdown(Some(watches)).await;
    Ok(())
}
