//! ---
//! pms_section: "03-variable-store"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Mutable variable records behind per-field atomic writes."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use r_pms_common::time::monotonic_stamp;
use r_pms_model::{Constraint, Value};
use tracing::trace;

use crate::{Result, StoreError};

/// Mutable record backing one variable field.
#[derive(Debug, Clone)]
pub struct VariableRecord {
    pub value: Value,
    pub constraint: Constraint,
    pub last_update: DateTime<Utc>,
}

/// Authoritative store of all module state.
///
/// Writes are atomic per field and accept-or-reject: a failed validation
/// leaves both value and stamp untouched. There is no cross-field
/// transaction; callers composing multi-field effects commit them as
/// sequential single-field writes.
#[derive(Debug, Default)]
pub struct VariableStore {
    fields: RwLock<HashMap<(String, String), VariableRecord>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field with its seed value and constraint.
    pub fn register(
        &self,
        module: &str,
        field: &str,
        seed: Value,
        constraint: Constraint,
    ) -> Result<()> {
        let mut fields = self.fields.write();
        let key = (module.to_owned(), field.to_owned());
        if fields.contains_key(&key) {
            return Err(StoreError::DuplicateField {
                module: module.to_owned(),
                field: field.to_owned(),
            });
        }
        fields.insert(
            key,
            VariableRecord {
                value: seed,
                constraint,
                last_update: monotonic_stamp(None),
            },
        );
        Ok(())
    }

    /// Current value of a registered field.
    pub fn read(&self, module: &str, field: &str) -> Result<Value> {
        let fields = self.fields.read();
        fields
            .get(&(module.to_owned(), field.to_owned()))
            .map(|record| record.value.clone())
            .ok_or_else(|| StoreError::UnknownField {
                module: module.to_owned(),
                field: field.to_owned(),
            })
    }

    /// Value together with its source timestamp.
    pub fn read_with_stamp(&self, module: &str, field: &str) -> Result<(Value, DateTime<Utc>)> {
        let fields = self.fields.read();
        fields
            .get(&(module.to_owned(), field.to_owned()))
            .map(|record| (record.value.clone(), record.last_update))
            .ok_or_else(|| StoreError::UnknownField {
                module: module.to_owned(),
                field: field.to_owned(),
            })
    }

    /// Timestamp of the last committed write.
    pub fn last_update(&self, module: &str, field: &str) -> Result<DateTime<Utc>> {
        Ok(self.read_with_stamp(module, field)?.1)
    }

    /// Validated write: rejects kind mismatches and constraint violations
    /// without mutating, otherwise commits and stamps `last_update`.
    pub fn write(&self, module: &str, field: &str, value: Value) -> Result<()> {
        self.commit(module, field, value, true)
    }

    /// Simulation-only path that bypasses the constraint predicate. The
    /// tagged kind is still enforced and `last_update` is still stamped.
    pub fn write_unchecked(&self, module: &str, field: &str, value: Value) -> Result<()> {
        self.commit(module, field, value, false)
    }

    fn commit(&self, module: &str, field: &str, value: Value, validate: bool) -> Result<()> {
        let mut fields = self.fields.write();
        let record = fields
            .get_mut(&(module.to_owned(), field.to_owned()))
            .ok_or_else(|| StoreError::UnknownField {
                module: module.to_owned(),
                field: field.to_owned(),
            })?;
        if record.value.kind() != value.kind() {
            return Err(StoreError::TypeMismatch {
                context: format!("{module}.{field}"),
                expected: record.value.kind().to_string(),
                actual: value.kind().to_string(),
            });
        }
        if validate && !record.constraint.permits(&value) {
            return Err(StoreError::ConstraintViolation {
                module: module.to_owned(),
                field: field.to_owned(),
                value: value.to_string(),
            });
        }
        record.last_update = monotonic_stamp(Some(record.last_update));
        record.value = value;
        trace!(module, field, value = %record.value, "field committed");
        Ok(())
    }
}
