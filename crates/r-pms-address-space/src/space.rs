//! ---
//! pms_section: "02-address-space-data-model"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Browsable node graph with forward references."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use std::collections::HashMap;

use r_pms_model::{MethodTemplate, NodeClass, NodeId, Value};
use r_pms_store::FieldBinding;

use crate::{Result, SpaceError};

/// Well-known root container every traversal starts from.
pub const OBJECTS_ROOT: NodeId = NodeId::new(0, 85);

const SERVER_OBJECT: NodeId = NodeId::new(0, 2253);
const SERVER_STATUS: NodeId = NodeId::new(0, 2256);

/// How a variable node resolves its value.
#[derive(Debug, Clone)]
pub enum NodeBinding {
    /// Fixed value assigned at build time (gateway identity, scaffolding).
    Static(Value),
    /// Live accessor into the variable store.
    Field(FieldBinding),
}

/// A node in the address space.
#[derive(Debug, Clone)]
pub enum Node {
    Object {
        node_id: NodeId,
        browse_name: String,
        display_name: String,
        /// Name of the object type this instance was stamped from, if any.
        type_name: Option<String>,
    },
    Variable {
        node_id: NodeId,
        browse_name: String,
        display_name: String,
        binding: NodeBinding,
    },
    Method {
        node_id: NodeId,
        browse_name: String,
        display_name: String,
        /// Store key of the owning module instance.
        module_key: String,
        template: MethodTemplate,
    },
}

impl Node {
    pub fn node_id(&self) -> NodeId {
        match self {
            Node::Object { node_id, .. }
            | Node::Variable { node_id, .. }
            | Node::Method { node_id, .. } => *node_id,
        }
    }

    pub fn browse_name(&self) -> &str {
        match self {
            Node::Object { browse_name, .. }
            | Node::Variable { browse_name, .. }
            | Node::Method { browse_name, .. } => browse_name,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Node::Object { display_name, .. }
            | Node::Variable { display_name, .. }
            | Node::Method { display_name, .. } => display_name,
        }
    }

    pub fn node_class(&self) -> NodeClass {
        match self {
            Node::Object { .. } => NodeClass::Object,
            Node::Variable { .. } => NodeClass::Variable,
            Node::Method { .. } => NodeClass::Method,
        }
    }
}

/// Forward reference returned by a browse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRef {
    pub node_id: NodeId,
    pub browse_name: String,
    pub display_name: String,
    pub node_class: NodeClass,
}

/// The browsable node graph.
///
/// Children are kept in insertion order so browse results are stable. The
/// graph starts out with the substrate scaffolding (`Objects` root plus a
/// `Server` subtree) that real traversals have to skip over.
#[derive(Debug)]
pub struct AddressSpace {
    nodes: HashMap<NodeId, Node>,
    children: HashMap<NodeId, Vec<NodeId>>,
    root: NodeId,
}

impl AddressSpace {
    pub fn new() -> Self {
        let mut space = Self {
            nodes: HashMap::new(),
            children: HashMap::new(),
            root: OBJECTS_ROOT,
        };
        space.nodes.insert(
            OBJECTS_ROOT,
            Node::Object {
                node_id: OBJECTS_ROOT,
                browse_name: "Objects".to_owned(),
                display_name: "Objects".to_owned(),
                type_name: None,
            },
        );
        space.children.insert(OBJECTS_ROOT, Vec::new());

        // Protocol scaffolding the deny-list filters out on the client.
        // Inserted directly: the graph is empty and the ids are constants.
        space.nodes.insert(
            SERVER_OBJECT,
            Node::Object {
                node_id: SERVER_OBJECT,
                browse_name: "Server".to_owned(),
                display_name: "Server".to_owned(),
                type_name: None,
            },
        );
        space.children.entry(OBJECTS_ROOT).or_default().push(SERVER_OBJECT);
        space.nodes.insert(
            SERVER_STATUS,
            Node::Variable {
                node_id: SERVER_STATUS,
                browse_name: "ServerStatus".to_owned(),
                display_name: "Server Status".to_owned(),
                binding: NodeBinding::Static(Value::Text("running".to_owned())),
            },
        );
        space.children.entry(SERVER_OBJECT).or_default().push(SERVER_STATUS);
        space
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Insert a node as a forward reference of `parent`.
    pub fn insert(&mut self, parent: NodeId, node: Node) -> Result<()> {
        if !self.nodes.contains_key(&parent) {
            return Err(SpaceError::UnknownParent(parent));
        }
        let id = node.node_id();
        if self.nodes.contains_key(&id) {
            return Err(SpaceError::DuplicateNodeId(id));
        }
        self.nodes.insert(id, node);
        self.children.entry(parent).or_default().push(id);
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Forward references of a node, in insertion order.
    pub fn browse(&self, id: NodeId) -> Vec<ChildRef> {
        self.children
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|child| self.nodes.get(child))
            .map(|node| ChildRef {
                node_id: node.node_id(),
                browse_name: node.browse_name().to_owned(),
                display_name: node.display_name().to_owned(),
                node_class: node.node_class(),
            })
            .collect()
    }

    /// Whether `child` is a direct forward reference of `parent`.
    pub fn is_child_of(&self, parent: NodeId, child: NodeId) -> bool {
        self.children
            .get(&parent)
            .map(|ids| ids.contains(&child))
            .unwrap_or(false)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}
