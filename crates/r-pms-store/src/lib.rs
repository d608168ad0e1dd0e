//! ---
//! pms_section: "03-variable-store"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Authoritative variable store and method dispatch."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
//! The single source of truth for module state. Address-space variables
//! never own storage; they go through the binding table into the store.

pub mod binding;
pub mod dispatch;
pub mod store;

/// Shared result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error taxonomy for store writes and method argument validation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Value outside the field's declared range or enumeration.
    #[error("constraint violation on {module}.{field}: value {value} rejected")]
    ConstraintViolation {
        module: String,
        field: String,
        value: String,
    },
    /// Tagged kind does not match the field or parameter declaration.
    #[error("type mismatch on {context}: expected {expected}, got {actual}")]
    TypeMismatch {
        context: String,
        expected: String,
        actual: String,
    },
    /// The `(module, field)` pair is not registered.
    #[error("unknown field {module}.{field}")]
    UnknownField { module: String, field: String },
    /// The `(module, field)` pair was registered twice.
    #[error("field {module}.{field} is already registered")]
    DuplicateField { module: String, field: String },
}

pub use binding::{BindingTable, FieldBinding};
pub use dispatch::{DispatchError, MethodDispatcher};
pub use store::{VariableRecord, VariableStore};
