//! ---
//! pms_section: "06-client"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Monitoring client: discovery, watches, method exercising."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
//! Console-side counterpart of the station substrate. Discovery walks the
//! address space (falling back to identifier probing when browse is
//! unavailable), watches mirror live variables, and the invoker exercises
//! the discovered alarm methods.

pub mod discovery;
pub mod invoker;
pub mod monitor;
pub mod session;

/// Shared result type for client workflows.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors raised by the client workflows.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Substrate(#[from] r_pms_substrate::SubstrateError),
    /// Neither browsing nor probing produced a single station node.
    #[error("discovery found no station nodes")]
    NothingDiscovered,
}

pub use discovery::{station_identity, Catalog, DiscoveredNode, Discoverer, DiscoveryPhase};
pub use invoker::{InvocationOutcome, MethodInvoker};
pub use monitor::{render_value, watch_variables, WatchSet};
pub use session::ClientSession;
