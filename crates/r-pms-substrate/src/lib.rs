//! ---
//! pms_section: "05-substrate"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Remote-access substrate trait and backends."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
//! The remote-access surface the monitoring client consumes: read, write,
//! browse, call, and subscribe over a tree of addressable nodes. The
//! in-process backend serves a station directly; the remote backend is a
//! placeholder until a wire protocol exists.

pub mod api;
pub mod in_process;
pub mod remote;
pub mod runtime;

/// Shared result type for substrate operations.
pub type Result<T> = std::result::Result<T, SubstrateError>;

/// Substrate-level failures, opaque to the domain core.
#[derive(Debug, thiserror::Error)]
pub enum SubstrateError {
    /// The underlying transport failed or is unavailable.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The session has been closed; only `disconnect` remains valid.
    #[error("session closed")]
    SessionClosed,
    /// Subscription target is missing or has no sampleable value.
    #[error("node {0} cannot be monitored ({1})")]
    NotMonitorable(r_pms_model::NodeId, api::StatusCode),
    /// Raised by backends whose transport is not yet implemented.
    #[error("substrate backend not yet implemented: {0}")]
    NotImplemented(&'static str),
}

pub use api::{
    Attribute, DataValue, Monitor, Notification, ReadItem, ReferenceDescription, StatusCode,
    SubscribeOptions, Substrate, WriteItem,
};
pub use in_process::InProcessSubstrate;
pub use remote::RemoteSubstrate;
pub use runtime::{SimulationHandle, Station};
