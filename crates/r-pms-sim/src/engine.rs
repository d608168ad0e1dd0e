//! ---
//! pms_section: "04-simulation"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Periodic perturbation of the variable store."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use std::sync::Arc;

use chrono::{Local, Timelike};
use r_pms_common::config::{AppConfig, ModuleKind, SimulationConfig};
use r_pms_model::{fields, SystemState, Value};
use r_pms_store::VariableStore;
use rand::prelude::*;
use tracing::{trace, warn};

/// Per-module simulation inputs derived from the station catalog.
#[derive(Debug, Clone)]
pub struct ModuleProfile {
    pub module_key: String,
    pub baseline_temperature: f64,
    pub has_crowd: bool,
}

/// Periodic task body that perturbs the store to emulate live sensors.
///
/// Ticks are memoryless: each one derives fresh offsets from the baselines
/// instead of accumulating drift. The engine writes pre-validated values
/// through the unchecked store path, which skips the constraint predicate
/// but still stamps `last_update`.
#[derive(Debug)]
pub struct SimulationEngine {
    store: Arc<VariableStore>,
    profiles: Vec<ModuleProfile>,
    config: SimulationConfig,
    rng: StdRng,
}

impl SimulationEngine {
    pub fn new(
        store: Arc<VariableStore>,
        profiles: Vec<ModuleProfile>,
        config: SimulationConfig,
    ) -> Self {
        let rng = StdRng::seed_from_u64(config.random_seed);
        Self {
            store,
            profiles,
            config,
            rng,
        }
    }

    /// Build the engine for every module in the station catalog.
    pub fn from_config(store: Arc<VariableStore>, config: &AppConfig) -> Self {
        let profiles = config
            .modules
            .iter()
            .map(|(key, module)| ModuleProfile {
                module_key: key.clone(),
                baseline_temperature: module.baseline_temperature,
                has_crowd: module.kind == ModuleKind::Advanced,
            })
            .collect();
        Self::new(store, profiles, config.simulation.clone())
    }

    /// Run one tick against the current wall-clock hour.
    pub fn tick(&mut self) {
        let hour = Local::now().hour();
        self.tick_at(hour);
    }

    /// Run one tick with an explicit hour of day. A module whose state
    /// cannot be read or written is skipped for this tick only.
    pub fn tick_at(&mut self, hour: u32) {
        for idx in 0..self.profiles.len() {
            let profile = self.profiles[idx].clone();
            if let Err(err) = self.tick_module(&profile, hour) {
                warn!(module = %profile.module_key, error = %err, "simulation tick skipped for module");
            }
        }
    }

    fn tick_module(
        &mut self,
        profile: &ModuleProfile,
        hour: u32,
    ) -> Result<(), r_pms_store::StoreError> {
        let raw_state = self
            .store
            .read(&profile.module_key, fields::SYSTEM_STATE)?
            .as_i32()
            .and_then(SystemState::from_i32);
        let Some(state) = raw_state else {
            // Out-of-enum state written through the unchecked path; leave
            // the module alone until an operator resets it.
            return Ok(());
        };

        if state == SystemState::On {
            let jitter = self.config.temperature_jitter;
            let temperature =
                profile.baseline_temperature + self.rng.gen_range(-jitter..=jitter);
            self.store.write_unchecked(
                &profile.module_key,
                fields::TEMPERATURE,
                Value::Double(temperature),
            )?;
            trace!(module = %profile.module_key, temperature, "temperature perturbed");
        }

        if profile.has_crowd {
            match state {
                SystemState::On => {
                    let baseline = if self
                        .config
                        .rush_windows
                        .iter()
                        .any(|window| window.contains(hour))
                    {
                        self.config.rush_crowd
                    } else {
                        self.config.base_crowd
                    };
                    let noise = self.config.crowd_noise;
                    let crowd =
                        (baseline + self.rng.gen_range(-noise..=noise)).clamp(0.0, 100.0);
                    self.store.write_unchecked(
                        &profile.module_key,
                        fields::CROWD_LEVEL,
                        Value::Double(crowd),
                    )?;
                    trace!(module = %profile.module_key, hour, crowd, "crowd level updated");
                }
                SystemState::Maintenance => {
                    self.store.write_unchecked(
                        &profile.module_key,
                        fields::CROWD_LEVEL,
                        Value::Double(0.0),
                    )?;
                }
                SystemState::Off => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use r_pms_common::config::RushWindow;
    use r_pms_model::Constraint;

    fn seeded_store(state: SystemState, crowd: bool) -> Arc<VariableStore> {
        let store = Arc::new(VariableStore::new());
        store
            .register(
                "module",
                fields::SYSTEM_STATE,
                state.as_value(),
                Constraint::IntRange { min: 0, max: 2 },
            )
            .expect("state field");
        store
            .register("module", fields::TEMPERATURE, Value::Double(22.0), Constraint::None)
            .expect("temperature field");
        if crowd {
            store
                .register(
                    "module",
                    fields::CROWD_LEVEL,
                    Value::Double(35.0),
                    Constraint::Range { min: 0.0, max: 100.0 },
                )
                .expect("crowd field");
        }
        store
    }

    fn engine(store: Arc<VariableStore>, crowd: bool, config: SimulationConfig) -> SimulationEngine {
        SimulationEngine::new(
            store,
            vec![ModuleProfile {
                module_key: "module".to_owned(),
                baseline_temperature: 22.0,
                has_crowd: crowd,
            }],
            config,
        )
    }

    #[test]
    fn maintenance_pins_crowd_to_zero() {
        let store = seeded_store(SystemState::Maintenance, true);
        let mut engine = engine(store.clone(), true, SimulationConfig::default());
        for hour in 0..48 {
            engine.tick_at(hour % 24);
            assert_eq!(
                store.read("module", fields::CROWD_LEVEL).expect("read"),
                Value::Double(0.0)
            );
        }
    }

    #[test]
    fn temperature_stays_within_jitter_of_baseline() {
        let store = seeded_store(SystemState::On, false);
        let mut engine = engine(store.clone(), false, SimulationConfig::default());
        for _ in 0..200 {
            engine.tick_at(12);
            let temperature = store
                .read("module", fields::TEMPERATURE)
                .expect("read")
                .as_f64()
                .expect("double");
            assert!((temperature - 22.0).abs() <= 0.5 + f64::EPSILON);
        }
    }

    #[test]
    fn rush_windows_raise_the_crowd_baseline() {
        let config = SimulationConfig {
            crowd_noise: 0.0,
            rush_windows: vec![RushWindow { start_hour: 7, end_hour: 9 }],
            ..SimulationConfig::default()
        };
        let store = seeded_store(SystemState::On, true);
        let mut engine = engine(store.clone(), true, config);

        engine.tick_at(8);
        assert_eq!(
            store.read("module", fields::CROWD_LEVEL).expect("read"),
            Value::Double(70.0)
        );
        engine.tick_at(12);
        assert_eq!(
            store.read("module", fields::CROWD_LEVEL).expect("read"),
            Value::Double(30.0)
        );
    }

    #[test]
    fn off_modules_are_left_untouched() {
        let store = seeded_store(SystemState::Off, true);
        let temp_before = store
            .last_update("module", fields::TEMPERATURE)
            .expect("stamp");
        let crowd_before = store
            .last_update("module", fields::CROWD_LEVEL)
            .expect("stamp");
        let mut engine = engine(store.clone(), true, SimulationConfig::default());
        engine.tick_at(8);
        assert_eq!(
            store.last_update("module", fields::TEMPERATURE).expect("stamp"),
            temp_before
        );
        assert_eq!(
            store.last_update("module", fields::CROWD_LEVEL).expect("stamp"),
            crowd_before
        );
    }

    #[test]
    fn ticks_stamp_last_update() {
        let store = seeded_store(SystemState::On, false);
        let before = store
            .last_update("module", fields::TEMPERATURE)
            .expect("stamp");
        let mut engine = engine(store.clone(), false, SimulationConfig::default());
        engine.tick_at(12);
        assert!(store.last_update("module", fields::TEMPERATURE).expect("stamp") > before);
    }

    #[test]
    fn seeded_engines_are_deterministic() {
        let run = || {
            let store = seeded_store(SystemState::On, true);
            let mut engine = engine(store.clone(), true, SimulationConfig::default());
            engine.tick_at(8);
            (
                store.read("module", fields::TEMPERATURE).expect("read"),
                store.read("module", fields::CROWD_LEVEL).expect("read"),
            )
        };
        assert_eq!(run(), run());
    }
}
