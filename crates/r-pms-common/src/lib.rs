//! ---
//! pms_section: "01-core-functionality"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Shared primitives and utilities for the core runtime."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
//! Core shared primitives for the R-PMS workspace.
//! This crate exposes configuration loading, logging setup, and timestamp
//! utilities consumed across the workspace.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{
    AppConfig, ClientConfig, LoggingConfig, ModuleConfig, ModuleKind, SimulationConfig,
    StationConfig,
};
pub use logging::{init_tracing, LogFormat};
pub use time::monotonic_stamp;
