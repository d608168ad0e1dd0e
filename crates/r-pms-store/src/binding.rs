//! ---
//! pms_section: "03-variable-store"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Inspectable accessor descriptors between variables and the store."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use std::collections::HashMap;

use r_pms_model::{Constraint, Value, ValueKind};

use crate::store::VariableStore;
use crate::Result;

/// Accessor descriptor tying an address-space variable to its store field.
///
/// Bindings are plain data rather than captured closures so the table can be
/// inspected and tested without the remote-exposure layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBinding {
    pub module_key: String,
    pub field: String,
    pub kind: ValueKind,
    pub constraint: Constraint,
}

impl FieldBinding {
    pub fn new(module_key: &str, field: &str, kind: ValueKind, constraint: Constraint) -> Self {
        Self {
            module_key: module_key.to_owned(),
            field: field.to_owned(),
            kind,
            constraint,
        }
    }

    /// Getter half of the binding.
    pub fn read(&self, store: &VariableStore) -> Result<Value> {
        store.read(&self.module_key, &self.field)
    }

    /// Setter half of the binding; the store checks kind and constraint.
    pub fn write(&self, store: &VariableStore, value: Value) -> Result<()> {
        store.write(&self.module_key, &self.field, value)
    }
}

/// Registry of every live binding keyed by `(module_key, field)`.
#[derive(Debug, Default)]
pub struct BindingTable {
    entries: HashMap<(String, String), FieldBinding>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, binding: FieldBinding) {
        self.entries.insert(
            (binding.module_key.clone(), binding.field.clone()),
            binding,
        );
    }

    pub fn lookup(&self, module_key: &str, field: &str) -> Option<&FieldBinding> {
        self.entries
            .get(&(module_key.to_owned(), field.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldBinding> {
        self.entries.values()
    }
}
