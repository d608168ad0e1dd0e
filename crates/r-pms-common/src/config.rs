//! ---
//! pms_section: "01-core-functionality"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Shared primitives and utilities for the core runtime."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use r_pms_model::SystemState;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_station_id() -> String {
    "STN_001".to_owned()
}

fn default_station_name() -> String {
    "Pordenone Centrale".to_owned()
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_simulation_seed() -> u64 {
    0x5EEDu64
}

fn default_temperature_jitter() -> f64 {
    0.5
}

fn default_base_crowd() -> f64 {
    30.0
}

fn default_rush_crowd() -> f64 {
    70.0
}

fn default_crowd_noise() -> f64 {
    10.0
}

fn default_rush_windows() -> Vec<RushWindow> {
    vec![
        RushWindow { start_hour: 7, end_hour: 9 },
        RushWindow { start_hour: 17, end_hour: 19 },
    ]
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_sampling_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_queue_size() -> usize {
    10
}

fn default_browse_depth() -> u32 {
    3
}

fn default_settle_delay() -> Duration {
    Duration::from_secs(3)
}

fn default_probe_namespace() -> u16 {
    1
}

fn default_probe_first() -> u32 {
    1011
}

fn default_probe_last() -> u32 {
    1027
}

fn default_max_invocations() -> usize {
    4
}

/// Primary configuration object for the R-PMS runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub station: StationConfig,
    /// Ordered catalog of platform modules keyed by module key.
    #[serde(default = "AppConfig::default_modules")]
    pub modules: IndexMap<String, ModuleConfig>,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "R_PMS_CONFIG";

    /// Load configuration from disk, respecting the `R_PMS_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig { config, source: path });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig { config, source: path });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reference station catalog. Identifiers reproduce the catalog the
    /// monitoring clients were commissioned against and must stay bit-exact.
    pub fn default_modules() -> IndexMap<String, ModuleConfig> {
        let mut modules = IndexMap::new();
        modules.insert(
            "base_module_001".to_owned(),
            ModuleConfig {
                kind: ModuleKind::Base,
                base_id: 1014,
                browse_name: "BaseModule_001".to_owned(),
                display_name: "Base Module 001".to_owned(),
                baseline_temperature: 22.5,
                initial_state: SystemState::On,
                initial_crowd: None,
            },
        );
        modules.insert(
            "base_module_002".to_owned(),
            ModuleConfig {
                kind: ModuleKind::Base,
                base_id: 1017,
                browse_name: "BaseModule_002".to_owned(),
                display_name: "Base Module 002".to_owned(),
                baseline_temperature: 21.8,
                initial_state: SystemState::On,
                initial_crowd: None,
            },
        );
        modules.insert(
            "advanced_module_001".to_owned(),
            ModuleConfig {
                kind: ModuleKind::Advanced,
                base_id: 1020,
                browse_name: "AdvancedModule_001".to_owned(),
                display_name: "Advanced Module 001".to_owned(),
                baseline_temperature: 23.1,
                initial_state: SystemState::On,
                initial_crowd: Some(35.0),
            },
        );
        modules.insert(
            "advanced_module_002".to_owned(),
            ModuleConfig {
                kind: ModuleKind::Advanced,
                base_id: 1024,
                browse_name: "AdvancedModule_002".to_owned(),
                display_name: "Advanced Module 002".to_owned(),
                baseline_temperature: 20.5,
                initial_state: SystemState::Maintenance,
                initial_crowd: Some(0.0),
            },
        );
        modules
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.modules.is_empty() {
            return Err(anyhow!("configuration must declare at least one module"));
        }
        // Gateway object and station variables occupy a reserved block.
        let mut blocks: Vec<(String, u32, u32)> =
            vec![("station_gateway".to_owned(), 1011, 1013)];
        for (key, module) in &self.modules {
            module.validate(key)?;
            blocks.push((key.clone(), module.base_id, module.block_end()));
        }
        blocks.sort_by_key(|(_, start, _)| *start);
        for pair in blocks.windows(2) {
            let (ref a, _, a_end) = pair[0];
            let (ref b, b_start, _) = pair[1];
            if b_start <= a_end {
                return Err(anyhow!(
                    "identifier blocks of '{}' and '{}' overlap",
                    a,
                    b
                ));
            }
        }
        self.simulation.validate()?;
        self.client.validate()?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            station: StationConfig::default(),
            modules: Self::default_modules(),
            simulation: SimulationConfig::default(),
            logging: LoggingConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Identity of the station gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    #[serde(default = "default_station_id")]
    pub id: String,
    #[serde(default = "default_station_name")]
    pub name: String,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            id: default_station_id(),
            name: default_station_name(),
        }
    }
}

/// Kind of platform module to instantiate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Base,
    Advanced,
}

impl ModuleKind {
    /// Number of identifiers the module block occupies: the object itself
    /// plus one per variable.
    pub fn block_len(&self) -> u32 {
        match self {
            ModuleKind::Base => 3,
            ModuleKind::Advanced => 4,
        }
    }
}

/// Declaration of a single platform module instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub kind: ModuleKind,
    /// First identifier of the module's contiguous block.
    pub base_id: u32,
    pub browse_name: String,
    pub display_name: String,
    pub baseline_temperature: f64,
    #[serde(default)]
    pub initial_state: SystemState,
    /// Seed crowd level, advanced modules only.
    #[serde(default)]
    pub initial_crowd: Option<f64>,
}

impl ModuleConfig {
    pub fn block_end(&self) -> u32 {
        self.base_id + self.kind.block_len() - 1
    }

    fn validate(&self, key: &str) -> Result<()> {
        if self.browse_name.trim().is_empty() {
            return Err(anyhow!("module '{}' must declare a browse name", key));
        }
        match self.kind {
            ModuleKind::Base if self.initial_crowd.is_some() => Err(anyhow!(
                "module '{}' is a base module and cannot seed a crowd level",
                key
            )),
            ModuleKind::Advanced => {
                if let Some(crowd) = self.initial_crowd {
                    if !(0.0..=100.0).contains(&crowd) {
                        return Err(anyhow!(
                            "module '{}' seeds crowd level {} outside [0,100]",
                            key,
                            crowd
                        ));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Inclusive hour-of-day window with an elevated crowd baseline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RushWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl RushWindow {
    pub fn contains(&self, hour: u32) -> bool {
        (self.start_hour..=self.end_hour).contains(&hour)
    }
}

/// Tuning of the periodic sensor simulation.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_tick_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub tick_interval: Duration,
    #[serde(default = "default_simulation_seed")]
    pub random_seed: u64,
    /// Symmetric bound of the per-tick temperature offset in Celsius.
    #[serde(default = "default_temperature_jitter")]
    pub temperature_jitter: f64,
    #[serde(default = "default_base_crowd")]
    pub base_crowd: f64,
    #[serde(default = "default_rush_crowd")]
    pub rush_crowd: f64,
    /// Symmetric bound of the per-tick crowd noise in percent.
    #[serde(default = "default_crowd_noise")]
    pub crowd_noise: f64,
    #[serde(default = "default_rush_windows")]
    pub rush_windows: Vec<RushWindow>,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(anyhow!("simulation tick interval must be positive"));
        }
        for window in &self.rush_windows {
            if window.start_hour > window.end_hour || window.end_hour > 23 {
                return Err(anyhow!(
                    "invalid rush window {}..{} (hours must satisfy start <= end <= 23)",
                    window.start_hour,
                    window.end_hour
                ));
            }
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            random_seed: default_simulation_seed(),
            temperature_jitter: default_temperature_jitter(),
            base_crowd: default_base_crowd(),
            rush_crowd: default_rush_crowd(),
            crowd_noise: default_crowd_noise(),
            rush_windows: default_rush_windows(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

/// Tuning of the monitoring client.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Sampling interval requested for each change watch.
    #[serde(default = "default_sampling_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub sampling_interval: Duration,
    /// Bounded per-watch notification queue (discard-oldest).
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
    #[serde(default = "default_browse_depth")]
    pub max_browse_depth: u32,
    /// Delay between discovery completion and method exercising.
    #[serde(default = "default_settle_delay")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub settle_delay: Duration,
    #[serde(default = "default_probe_namespace")]
    pub probe_namespace: u16,
    /// Inclusive candidate identifier range for the probing fallback.
    #[serde(default = "default_probe_first")]
    pub probe_first: u32,
    #[serde(default = "default_probe_last")]
    pub probe_last: u32,
    #[serde(default = "default_max_invocations")]
    pub max_method_invocations: usize,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.queue_size == 0 {
            return Err(anyhow!("client queue size must be at least 1"));
        }
        if self.probe_first > self.probe_last {
            return Err(anyhow!(
                "probe range {}..{} is empty",
                self.probe_first,
                self.probe_last
            ));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            sampling_interval: default_sampling_interval(),
            queue_size: default_queue_size(),
            max_browse_depth: default_browse_depth(),
            settle_delay: default_settle_delay(),
            probe_namespace: default_probe_namespace(),
            probe_first: default_probe_first(),
            probe_last: default_probe_last(),
            max_method_invocations: default_max_invocations(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_matches_reference_identifiers() {
        let config = AppConfig::default();
        config.validate().expect("default config valid");
        let bases: Vec<u32> = config.modules.values().map(|m| m.base_id).collect();
        assert_eq!(bases, [1014, 1017, 1020, 1024]);
        assert_eq!(config.modules["advanced_module_002"].block_end(), 1027);
    }

    #[test]
    fn overlapping_blocks_are_rejected() {
        let mut config = AppConfig::default();
        config.modules.get_index_mut(1).map(|(_, m)| m.base_id = 1015);
        let err = config.validate().expect_err("overlap expected");
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn blocks_may_not_collide_with_the_gateway() {
        let mut config = AppConfig::default();
        config.modules.get_index_mut(0).map(|(_, m)| m.base_id = 1012);
        assert!(config.validate().is_err());
    }

    #[test]
    fn base_modules_cannot_seed_crowd() {
        let mut config = AppConfig::default();
        config
            .modules
            .get_index_mut(0)
            .map(|(_, m)| m.initial_crowd = Some(10.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_minimal_override_file() {
        let toml = r#"
            [station]
            id = "STN_002"

            [modules.base_module_001]
            kind = "base"
            base_id = 1014
            browse_name = "BaseModule_001"
            display_name = "Base Module 001"
            baseline_temperature = 19.0
            initial_state = "off"

            [simulation]
            tick_interval = 1
        "#;
        let config: AppConfig = toml.parse().expect("parse");
        assert_eq!(config.station.id, "STN_002");
        assert_eq!(config.modules.len(), 1);
        assert_eq!(config.simulation.tick_interval, Duration::from_secs(1));
        assert_eq!(
            config.modules["base_module_001"].initial_state,
            SystemState::Off
        );
    }

    #[test]
    fn load_reads_the_first_existing_candidate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("station.toml");
        fs::write(
            &path,
            r#"
            [station]
            id = "STN_009"
            "#,
        )
        .expect("write config");

        let missing = dir.path().join("missing.toml");
        let loaded =
            AppConfig::load_with_source(&[missing.clone(), path.clone()]).expect("load");
        assert_eq!(loaded.source, path);
        assert_eq!(loaded.config.station.id, "STN_009");
        // Unspecified sections fall back to the reference catalog.
        assert_eq!(loaded.config.modules.len(), 4);

        assert!(AppConfig::load(&[missing]).is_err());
    }

    #[test]
    fn invalid_rush_window_is_rejected() {
        let mut config = AppConfig::default();
        config.simulation.rush_windows.push(RushWindow {
            start_hour: 20,
            end_hour: 4,
        });
        assert!(config.validate().is_err());
    }
}
