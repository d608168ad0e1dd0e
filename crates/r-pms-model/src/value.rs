//! ---
//! pms_section: "02-address-space-data-model"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Tagged values, constraints, and the system state enumeration."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};

/// Primitive kind tag carried by every variable and method parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Int32,
    Double,
    Boolean,
    Text,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ValueKind::Int32 => "int32",
            ValueKind::Double => "double",
            ValueKind::Boolean => "boolean",
            ValueKind::Text => "text",
        };
        f.write_str(label)
    }
}

/// Tagged value as stored in variable records and carried over the substrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Int32(i32),
    Double(f64),
    Boolean(bool),
    Text(String),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int32(_) => ValueKind::Int32,
            Value::Double(_) => ValueKind::Double,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Text(_) => ValueKind::Text,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int32(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
        }
    }
}

/// Declarative validation predicate attached to a variable field.
///
/// Constraints are plain data so bindings stay inspectable without going
/// through the remote-exposure layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "constraint", rename_all = "snake_case")]
pub enum Constraint {
    /// Any value of the declared kind is accepted.
    None,
    /// Integer values restricted to an inclusive range.
    IntRange { min: i32, max: i32 },
    /// Floating point values restricted to an inclusive range.
    Range { min: f64, max: f64 },
}

impl Constraint {
    /// Check the predicate. Kind mismatches are out of scope here; the store
    /// rejects those separately before consulting the constraint.
    pub fn permits(&self, value: &Value) -> bool {
        match (self, value) {
            (Constraint::None, _) => true,
            (Constraint::IntRange { min, max }, Value::Int32(v)) => (*min..=*max).contains(v),
            (Constraint::Range { min, max }, Value::Double(v)) => *v >= *min && *v <= *max,
            _ => false,
        }
    }
}

/// Operational state of a platform module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum SystemState {
    #[default]
    On = 0,
    Off = 1,
    Maintenance = 2,
}

impl SystemState {
    pub fn from_i32(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(SystemState::On),
            1 => Some(SystemState::Off),
            2 => Some(SystemState::Maintenance),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SystemState::On => "on",
            SystemState::Off => "off",
            SystemState::Maintenance => "maintenance",
        }
    }

    pub fn as_value(&self) -> Value {
        Value::Int32(*self as i32)
    }
}
