//! ---
//! pms_section: "02-address-space-data-model"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Instantiation of object types into identifier blocks."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use std::collections::HashSet;

use r_pms_model::{NodeId, TypeHandle, TypeRegistry, Value};
use r_pms_store::{BindingTable, FieldBinding, VariableStore};
use tracing::debug;

use crate::space::{AddressSpace, Node, NodeBinding};
use crate::{Result, SpaceError};

/// Method nodes live outside the module blocks so that consecutive modules
/// can pack their variables contiguously.
const METHOD_ID_BASE: u32 = 5000;

/// A concrete module object stamped from an object type.
#[derive(Debug, Clone)]
pub struct ModuleInstance {
    pub module_key: String,
    pub type_name: String,
    pub node_id: NodeId,
}

/// Builds the concrete address space out of registered object types.
///
/// Allocation is block based: the object claims `base_id`, its inherited
/// variables the following identifiers in effective template order. The
/// builder tracks claimed blocks and instantiated `(module_key, base_id)`
/// pairs and fails on any collision.
pub struct AddressSpaceBuilder {
    namespace: u16,
    space: AddressSpace,
    bindings: BindingTable,
    claimed_blocks: Vec<(u32, u32)>,
    instantiated: HashSet<(String, u32)>,
    next_method_id: u32,
}

impl AddressSpaceBuilder {
    pub fn new(namespace: u16) -> Self {
        Self {
            namespace,
            space: AddressSpace::new(),
            bindings: BindingTable::new(),
            claimed_blocks: Vec::new(),
            instantiated: HashSet::new(),
            next_method_id: METHOD_ID_BASE,
        }
    }

    pub fn space(&self) -> &AddressSpace {
        &self.space
    }

    /// Add a top-level gateway object with static identity variables.
    ///
    /// Claims the block `object_id..=object_id + variables`.
    pub fn add_gateway(
        &mut self,
        object_id: u32,
        browse_name: &str,
        display_name: &str,
        variables: &[(&str, &str, Value)],
    ) -> Result<NodeId> {
        let end = object_id + variables.len() as u32;
        self.claim_block(object_id, end)?;
        let gateway = NodeId::new(self.namespace, object_id);
        self.space.insert(
            self.space.root(),
            Node::Object {
                node_id: gateway,
                browse_name: browse_name.to_owned(),
                display_name: display_name.to_owned(),
                type_name: None,
            },
        )?;
        for (offset, (browse, display, value)) in variables.iter().enumerate() {
            self.space.insert(
                gateway,
                Node::Variable {
                    node_id: NodeId::new(self.namespace, object_id + 1 + offset as u32),
                    browse_name: (*browse).to_owned(),
                    display_name: (*display).to_owned(),
                    binding: NodeBinding::Static(value.clone()),
                },
            )?;
        }
        Ok(gateway)
    }

    /// Instantiate `type_handle` as a concrete module under `parent`.
    ///
    /// Seeds every inherited variable into the store (respecting
    /// `overrides`), records its accessor in the binding table, and exposes
    /// the inherited methods as child nodes.
    pub fn instantiate(
        &mut self,
        registry: &TypeRegistry,
        type_handle: TypeHandle,
        parent: NodeId,
        browse_name: &str,
        display_name: &str,
        module_key: &str,
        base_id: u32,
        store: &VariableStore,
        overrides: &[(&str, Value)],
    ) -> Result<ModuleInstance> {
        if !self
            .instantiated
            .insert((module_key.to_owned(), base_id))
        {
            return Err(SpaceError::Collision {
                module_key: module_key.to_owned(),
                base_id,
            });
        }

        let variables = registry.effective_variables(type_handle)?;
        let block_end = base_id + variables.len() as u32;
        self.claim_block(base_id, block_end)?;

        let object_id = NodeId::new(self.namespace, base_id);
        let type_name = registry.type_name(type_handle)?.to_owned();
        self.space.insert(
            parent,
            Node::Object {
                node_id: object_id,
                browse_name: browse_name.to_owned(),
                display_name: display_name.to_owned(),
                type_name: Some(type_name.clone()),
            },
        )?;

        for (offset, template) in variables.iter().enumerate() {
            let seed = overrides
                .iter()
                .find(|(name, _)| *name == template.name)
                .map(|(_, value)| value.clone())
                .unwrap_or_else(|| template.default_value.clone());
            store.register(module_key, &template.name, seed, template.constraint)?;

            let binding = FieldBinding::new(
                module_key,
                &template.name,
                template.kind,
                template.constraint,
            );
            self.bindings.insert(binding.clone());
            self.space.insert(
                object_id,
                Node::Variable {
                    node_id: NodeId::new(self.namespace, base_id + 1 + offset as u32),
                    browse_name: template.name.clone(),
                    display_name: template.name.clone(),
                    binding: NodeBinding::Field(binding),
                },
            )?;
        }

        for template in registry.effective_methods(type_handle)? {
            let method_id = NodeId::new(self.namespace, self.next_method_id);
            self.next_method_id += 1;
            self.space.insert(
                object_id,
                Node::Method {
                    node_id: method_id,
                    browse_name: template.name.clone(),
                    display_name: template.name.clone(),
                    module_key: module_key.to_owned(),
                    template: (*template).clone(),
                },
            )?;
        }

        debug!(
            module = module_key,
            %object_id,
            type_name = %type_name,
            block_end,
            "module instantiated"
        );
        Ok(ModuleInstance {
            module_key: module_key.to_owned(),
            type_name,
            node_id: object_id,
        })
    }

    pub fn finish(self) -> (AddressSpace, BindingTable) {
        (self.space, self.bindings)
    }

    fn claim_block(&mut self, start: u32, end: u32) -> Result<()> {
        for (claimed_start, claimed_end) in &self.claimed_blocks {
            if start <= *claimed_end && end >= *claimed_start {
                return Err(SpaceError::BlockOverlap { start, end });
            }
        }
        self.claimed_blocks.push((start, end));
        Ok(())
    }
}
