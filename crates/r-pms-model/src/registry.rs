//! ---
//! pms_section: "02-address-space-data-model"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Object type registry with single-inheritance flattening."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

use crate::value::{Constraint, Value, ValueKind};
use crate::{ModelError, Result};

/// Opaque handle to a registered object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle(usize);

/// Variable contributed by an object type to each of its instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableTemplate {
    pub name: String,
    pub kind: ValueKind,
    pub constraint: Constraint,
    /// Seed value used when an instance does not override the field.
    pub default_value: Value,
}

impl VariableTemplate {
    pub fn new(name: &str, constraint: Constraint, default_value: Value) -> Self {
        Self {
            name: name.to_owned(),
            kind: default_value.kind(),
            constraint,
            default_value,
        }
    }
}

/// Typed method parameter declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodParameter {
    pub name: String,
    pub kind: ValueKind,
}

impl MethodParameter {
    pub fn new(name: &str, kind: ValueKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
        }
    }
}

/// Method contributed by an object type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodTemplate {
    pub name: String,
    pub params: Vec<MethodParameter>,
}

impl MethodTemplate {
    pub fn new(name: &str, params: Vec<MethodParameter>) -> Self {
        Self {
            name: name.to_owned(),
            params,
        }
    }
}

/// Definition of a reusable object type.
#[derive(Debug, Clone)]
pub struct ObjectTypeDef {
    pub name: String,
    pub parent: Option<TypeHandle>,
    variables: Vec<VariableTemplate>,
    methods: Vec<MethodTemplate>,
}

/// Registry of object types with single inheritance.
///
/// Behaviour is data driven: the effective variable and method set of a type
/// is the flattened union of its ancestors' templates and its own, ancestors
/// first, in declaration order. Redefining a name already contributed by an
/// ancestor is rejected at definition time.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: Vec<ObjectTypeDef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new type, optionally deriving from a previously defined one.
    pub fn define_type(&mut self, name: &str, parent: Option<TypeHandle>) -> Result<TypeHandle> {
        if self.types.iter().any(|t| t.name == name) {
            return Err(ModelError::DuplicateType(name.to_owned()));
        }
        if let Some(parent) = parent {
            self.resolve(parent)?;
        }
        self.types.push(ObjectTypeDef {
            name: name.to_owned(),
            parent,
            variables: Vec::new(),
            methods: Vec::new(),
        });
        Ok(TypeHandle(self.types.len() - 1))
    }

    /// Attach a variable template to a type.
    pub fn add_variable_template(
        &mut self,
        handle: TypeHandle,
        template: VariableTemplate,
    ) -> Result<()> {
        self.check_name_free(handle, &template.name)?;
        self.types[handle.0].variables.push(template);
        Ok(())
    }

    /// Attach a method template to a type.
    pub fn add_method_template(&mut self, handle: TypeHandle, template: MethodTemplate) -> Result<()> {
        self.check_name_free(handle, &template.name)?;
        self.types[handle.0].methods.push(template);
        Ok(())
    }

    /// Name of the registered type.
    pub fn type_name(&self, handle: TypeHandle) -> Result<&str> {
        Ok(&self.resolve(handle)?.name)
    }

    /// Effective variable templates, ancestors first in declaration order.
    pub fn effective_variables(&self, handle: TypeHandle) -> Result<Vec<&VariableTemplate>> {
        let mut out = Vec::new();
        for idx in self.lineage(handle)? {
            out.extend(self.types[idx].variables.iter());
        }
        Ok(out)
    }

    /// Effective method templates, ancestors first in declaration order.
    pub fn effective_methods(&self, handle: TypeHandle) -> Result<Vec<&MethodTemplate>> {
        let mut out = Vec::new();
        for idx in self.lineage(handle)? {
            out.extend(self.types[idx].methods.iter());
        }
        Ok(out)
    }

    fn resolve(&self, handle: TypeHandle) -> Result<&ObjectTypeDef> {
        self.types.get(handle.0).ok_or(ModelError::UnknownType(handle.0))
    }

    /// Ancestor chain indices, root ancestor first.
    fn lineage(&self, handle: TypeHandle) -> Result<Vec<usize>> {
        let mut chain = Vec::new();
        let mut cursor = Some(handle);
        while let Some(h) = cursor {
            let def = self.resolve(h)?;
            chain.push(h.0);
            cursor = def.parent;
        }
        chain.reverse();
        Ok(chain)
    }

    fn check_name_free(&self, handle: TypeHandle, name: &str) -> Result<()> {
        for idx in self.lineage(handle)? {
            let def = &self.types[idx];
            if def.variables.iter().any(|t| t.name == name)
                || def.methods.iter().any(|t| t.name == name)
            {
                return Err(ModelError::TemplateConflict {
                    type_name: self.types[handle.0].name.clone(),
                    template: name.to_owned(),
                });
            }
        }
        Ok(())
    }
}
