//! ---
//! pms_section: "05-substrate"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Substrate trait and the wire-level value types."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r_pms_model::{NodeClass, NodeId, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::Result;

/// Node attributes addressable through `read`.
///
/// Discriminants follow the reference attribute numbering so identifiers
/// survive a future wire protocol unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Attribute {
    NodeClass = 2,
    BrowseName = 3,
    DisplayName = 4,
    Value = 13,
}

impl Attribute {
    pub fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            2 => Some(Attribute::NodeClass),
            3 => Some(Attribute::BrowseName),
            4 => Some(Attribute::DisplayName),
            13 => Some(Attribute::Value),
            _ => None,
        }
    }
}

/// Per-operation outcome carried alongside (not instead of) results.
///
/// Transport failures surface as `SubstrateError`; these codes report how the
/// station judged an individual item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Good,
    BadOutOfRange,
    BadTypeMismatch,
    BadInvalidArgument,
    BadNodeIdUnknown,
    BadAttributeIdInvalid,
    BadMethodInvalid,
    BadNotWritable,
}

impl StatusCode {
    pub fn is_good(self) -> bool {
        self == StatusCode::Good
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::Good => "Good",
            StatusCode::BadOutOfRange => "BadOutOfRange",
            StatusCode::BadTypeMismatch => "BadTypeMismatch",
            StatusCode::BadInvalidArgument => "BadInvalidArgument",
            StatusCode::BadNodeIdUnknown => "BadNodeIdUnknown",
            StatusCode::BadAttributeIdInvalid => "BadAttributeIdInvalid",
            StatusCode::BadMethodInvalid => "BadMethodInvalid",
            StatusCode::BadNotWritable => "BadNotWritable",
        };
        f.write_str(name)
    }
}

/// One attribute read request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadItem {
    pub node_id: NodeId,
    pub attribute: Attribute,
}

impl ReadItem {
    pub fn value(node_id: NodeId) -> Self {
        Self {
            node_id,
            attribute: Attribute::Value,
        }
    }
}

/// One value write request. Only the Value attribute is writable.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteItem {
    pub node_id: NodeId,
    pub value: Value,
}

/// Read result: a status plus, when good, the value and its source stamp.
#[derive(Debug, Clone, PartialEq)]
pub struct DataValue {
    pub status: StatusCode,
    pub value: Option<Value>,
    pub source_timestamp: Option<DateTime<Utc>>,
}

impl DataValue {
    pub fn good(value: Value, source_timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            status: StatusCode::Good,
            value: Some(value),
            source_timestamp,
        }
    }

    pub fn bad(status: StatusCode) -> Self {
        Self {
            status,
            value: None,
            source_timestamp: None,
        }
    }

    pub fn is_good(&self) -> bool {
        self.status.is_good()
    }
}

/// Forward reference returned by `browse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDescription {
    pub node_id: NodeId,
    pub browse_name: String,
    pub display_name: String,
    pub node_class: NodeClass,
}

/// Sampled change delivered through a monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub node_id: NodeId,
    pub value: Value,
    pub source_timestamp: DateTime<Utc>,
}

/// Monitored-item parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// How often the sampler polls the variable.
    pub sampling_interval: Duration,
    /// Bounded per-item queue; when full the oldest sample is discarded.
    pub queue_size: usize,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            sampling_interval: Duration::from_millis(1000),
            queue_size: 10,
        }
    }
}

/// Live monitored item: a notification stream plus its sampler task.
///
/// Dropping the monitor without `terminate` leaves the sampler running until
/// the receiver side is dropped; orderly teardown calls `terminate`.
#[derive(Debug)]
pub struct Monitor {
    node_id: NodeId,
    rx: mpsc::Receiver<Notification>,
    sampler: JoinHandle<()>,
}

impl Monitor {
    pub(crate) fn new(
        node_id: NodeId,
        rx: mpsc::Receiver<Notification>,
        sampler: JoinHandle<()>,
    ) -> Self {
        Self { node_id, rx, sampler }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Next notification, or `None` once the sampler has stopped and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Stop the sampler and drop any queued notifications.
    pub fn terminate(self) {
        self.sampler.abort();
    }
}

/// Remote access to a station: the five primitives the console client uses.
///
/// Lifecycle is `connect` → `create_session` → operations → `close_session`
/// → `disconnect`. After `close_session` every operation except `disconnect`
/// fails with `SubstrateError::SessionClosed`.
#[async_trait]
pub trait Substrate: Send + Sync {
    async fn connect(&self) -> Result<()>;
    async fn create_session(&self) -> Result<()>;

    /// Forward references of `node_id`, in the station's stable order.
    async fn browse(&self, node_id: NodeId) -> Result<Vec<ReferenceDescription>>;

    /// Read attributes; one `DataValue` per item, same order.
    async fn read(&self, items: &[ReadItem]) -> Result<Vec<DataValue>>;

    /// Write Value attributes; one status per item, same order.
    async fn write(&self, items: &[WriteItem]) -> Result<Vec<StatusCode>>;

    /// Invoke `method_id` on `object_id` with positional arguments.
    async fn call(
        &self,
        object_id: NodeId,
        method_id: NodeId,
        args: &[Value],
    ) -> Result<StatusCode>;

    /// Create a monitored item over a variable's Value attribute.
    async fn subscribe(&self, node_id: NodeId, options: SubscribeOptions) -> Result<Monitor>;

    async fn close_session(&self) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;
}
