//! ---
//! pms_section: "02-address-space-data-model"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Address-space node graph and station catalog builder."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
//! Server-side address space: the browsable node graph, the builder that
//! instantiates module types into identifier blocks, and the fixed station
//! catalog.

pub mod builder;
pub mod catalog;
pub mod space;

/// Shared result type for address-space construction.
pub type Result<T> = std::result::Result<T, SpaceError>;

/// Errors raised while building the address space.
#[derive(Debug, thiserror::Error)]
pub enum SpaceError {
    /// The `(module_key, base_id)` pair was instantiated twice.
    #[error("module '{module_key}' with base identifier {base_id} is already instantiated")]
    Collision { module_key: String, base_id: u32 },
    /// Two module blocks claim overlapping identifiers.
    #[error("identifier block {start}..={end} overlaps an existing block")]
    BlockOverlap { start: u32, end: u32 },
    /// A node identifier was inserted twice.
    #[error("duplicate node identifier {0}")]
    DuplicateNodeId(r_pms_model::NodeId),
    /// The referenced parent node does not exist.
    #[error("unknown parent node {0}")]
    UnknownParent(r_pms_model::NodeId),
    #[error(transparent)]
    Model(#[from] r_pms_model::ModelError),
    #[error(transparent)]
    Store(#[from] r_pms_store::StoreError),
}

pub use builder::{AddressSpaceBuilder, ModuleInstance};
pub use catalog::{build_station, platform_types, StationAddressSpace, GATEWAY_NAMESPACE};
pub use space::{AddressSpace, ChildRef, Node, NodeBinding, OBJECTS_ROOT};
