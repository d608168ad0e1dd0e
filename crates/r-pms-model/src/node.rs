//! ---
//! pms_section: "02-address-space-data-model"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Node identifiers and node class tags."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable address of an entity in the hierarchical store.
///
/// Rendered as `ns=<namespace>;i=<id>` which is the textual form the
/// reference catalog uses for its module blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    pub ns: u16,
    pub id: u32,
}

impl NodeId {
    pub const fn new(ns: u16, id: u32) -> Self {
        Self { ns, id }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ns={};i={}", self.ns, self.id)
    }
}

/// Classification of an addressable node.
///
/// Discriminants match the wire encoding used by the probe path, where a
/// node-class attribute read yields the raw integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum NodeClass {
    Object = 1,
    Variable = 2,
    Method = 4,
}

impl NodeClass {
    /// Decode a node-class attribute value; unknown discriminants yield `None`.
    pub fn from_i32(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(NodeClass::Object),
            2 => Some(NodeClass::Variable),
            4 => Some(NodeClass::Method),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_renders_reference_form() {
        assert_eq!(NodeId::new(1, 1014).to_string(), "ns=1;i=1014");
        assert_eq!(NodeId::new(0, 85).to_string(), "ns=0;i=85");
    }

    #[test]
    fn node_class_round_trips_discriminants() {
        for class in [NodeClass::Object, NodeClass::Variable, NodeClass::Method] {
            assert_eq!(NodeClass::from_i32(class as i32), Some(class));
        }
        assert_eq!(NodeClass::from_i32(3), None);
        assert_eq!(NodeClass::from_i32(0), None);
    }
}
