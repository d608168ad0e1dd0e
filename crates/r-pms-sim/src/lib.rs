//! ---
//! pms_section: "04-simulation"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Simulation runtime module exports."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
//! Sensor simulation for the station runtime: temperature drift around
//! per-module baselines and time-of-day crowd patterns.

pub mod engine;

pub use engine::{ModuleProfile, SimulationEngine};
