//! ---
//! pms_section: "05-substrate"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Station runtime: store, address space, dispatcher, simulation."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use std::sync::Arc;

use r_pms_address_space::{build_station, ModuleInstance};
use r_pms_common::config::AppConfig;
use r_pms_sim::SimulationEngine;
use r_pms_store::{MethodDispatcher, VariableStore};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::in_process::InProcessSubstrate;

/// A fully assembled station: the store, the address space serving it, and
/// the method dispatcher, wired into an in-process substrate.
#[derive(Debug)]
pub struct Station {
    config: AppConfig,
    store: Arc<VariableStore>,
    substrate: InProcessSubstrate,
    modules: Vec<ModuleInstance>,
    node_count: usize,
}

impl Station {
    /// Build the station described by `config`.
    pub fn build(config: AppConfig) -> anyhow::Result<Self> {
        Self::assemble(config, true)
    }

    /// Build a station whose browse service is disabled, leaving clients to
    /// the identifier-probe fallback.
    pub fn build_without_browse(config: AppConfig) -> anyhow::Result<Self> {
        Self::assemble(config, false)
    }

    fn assemble(config: AppConfig, browse_enabled: bool) -> anyhow::Result<Self> {
        config.validate()?;
        let store = Arc::new(VariableStore::new());
        let station = build_station(&config, &store)?;
        let node_count = station.space.node_count();
        let dispatcher = MethodDispatcher::new(store.clone());
        let substrate = if browse_enabled {
            InProcessSubstrate::new(station.space, store.clone(), dispatcher)
        } else {
            InProcessSubstrate::without_browse(station.space, store.clone(), dispatcher)
        };
        info!(
            station = %config.station.id,
            modules = station.modules.len(),
            nodes = node_count,
            "station assembled"
        );
        Ok(Self {
            config,
            store,
            substrate,
            modules: station.modules,
            node_count,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<VariableStore> {
        self.store.clone()
    }

    /// Handle to the substrate; clones share the same station.
    pub fn substrate(&self) -> InProcessSubstrate {
        self.substrate.clone()
    }

    pub fn modules(&self) -> &[ModuleInstance] {
        &self.modules
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Start the periodic sensor simulation on the tokio runtime.
    pub fn spawn_simulation(&self) -> SimulationHandle {
        let mut engine = SimulationEngine::from_config(self.store.clone(), &self.config);
        let tick_interval = self.config.simulation.tick_interval;
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // First interval tick fires immediately and seeds live values.
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        engine.tick();
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("simulation loop stopping");
                        return;
                    }
                }
            }
        });

        info!(interval = ?tick_interval, "simulation started");
        SimulationHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Running simulation loop with an orderly stop.
#[derive(Debug)]
pub struct SimulationHandle {
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl SimulationHandle {
    /// Signal the loop and wait for it to drain its current tick.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.task.await;
        info!("simulation stopped");
    }
}
