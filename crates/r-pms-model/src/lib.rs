//! ---
//! pms_section: "02-address-space-data-model"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Typed value model and object type registry."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
//! Data model shared between the station server and the monitoring client:
//! node identifiers, tagged values with validation constraints, and the
//! object type registry that drives address-space instantiation.

pub mod node;
pub mod registry;
pub mod value;

/// Shared result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while defining object types.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A type name was registered twice.
    #[error("object type '{0}' is already defined")]
    DuplicateType(String),
    /// A template name clashes with one contributed by the type or an ancestor.
    #[error("template '{template}' conflicts with an existing template on type '{type_name}'")]
    TemplateConflict { type_name: String, template: String },
    /// A type handle does not resolve to a registered type.
    #[error("unknown object type handle {0}")]
    UnknownType(usize),
}

pub use node::{NodeClass, NodeId};
pub use registry::{
    MethodParameter, MethodTemplate, ObjectTypeDef, TypeHandle, TypeRegistry, VariableTemplate,
};
pub use value::{Constraint, SystemState, Value, ValueKind};

/// Browse names of the fields every platform module carries.
pub mod fields {
    /// Operational state enumeration, `0=on 1=off 2=maintenance`.
    pub const SYSTEM_STATE: &str = "SystemState";
    /// Ambient temperature in Celsius.
    pub const TEMPERATURE: &str = "Temperature";
    /// Platform crowd density in percent, advanced modules only.
    pub const CROWD_LEVEL: &str = "CrowdLevel";
    /// Acoustic alarm flag. Store-only, reachable through methods.
    pub const ALARM_ACTIVE: &str = "AlarmActive";
    /// Alarm sound level in dB. Store-only, reachable through methods.
    pub const SOUND_LEVEL: &str = "SoundLevel";
}

/// Method browse names exposed by the module types.
pub mod methods {
    /// `SetAlarm(active: bool)`, defined on the base module type.
    pub const SET_ALARM: &str = "SetAlarm";
    /// `SetAlarmWithLevel(active: bool, sound_level: f64)`, advanced modules.
    pub const SET_ALARM_WITH_LEVEL: &str = "SetAlarmWithLevel";
}
