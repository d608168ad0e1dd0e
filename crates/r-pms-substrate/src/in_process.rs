//! ---
//! pms_section: "05-substrate"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "In-process substrate backend serving a station directly."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r_pms_address_space::{AddressSpace, Node, NodeBinding};
use r_pms_model::{NodeId, Value};
use r_pms_store::{DispatchError, MethodDispatcher, StoreError, VariableStore};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::api::{
    Attribute, DataValue, Monitor, Notification, ReadItem, ReferenceDescription, StatusCode,
    SubscribeOptions, Substrate, WriteItem,
};
use crate::{Result, SubstrateError};

/// Substrate backend bound to a station living in the same process.
///
/// Connection and session are bookkeeping only, but the lifecycle rules are
/// enforced exactly as a networked backend would: operations after
/// `close_session` fail, and samplers stop when the session goes away.
#[derive(Debug, Clone)]
pub struct InProcessSubstrate {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    space: AddressSpace,
    store: Arc<VariableStore>,
    dispatcher: MethodDispatcher,
    /// Disabled to emulate stations whose browse service is unavailable,
    /// forcing clients onto the identifier-probe fallback.
    browse_enabled: bool,
    connected: AtomicBool,
    session_open: AtomicBool,
}

impl InProcessSubstrate {
    pub fn new(space: AddressSpace, store: Arc<VariableStore>, dispatcher: MethodDispatcher) -> Self {
        Self::with_browse(space, store, dispatcher, true)
    }

    /// Backend whose browse service always fails, for probe-fallback paths.
    pub fn without_browse(
        space: AddressSpace,
        store: Arc<VariableStore>,
        dispatcher: MethodDispatcher,
    ) -> Self {
        Self::with_browse(space, store, dispatcher, false)
    }

    fn with_browse(
        space: AddressSpace,
        store: Arc<VariableStore>,
        dispatcher: MethodDispatcher,
        browse_enabled: bool,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                space,
                store,
                dispatcher,
                browse_enabled,
                connected: AtomicBool::new(false),
                session_open: AtomicBool::new(false),
            }),
        }
    }

    fn ensure_session(&self) -> Result<()> {
        if !self.inner.connected.load(Ordering::SeqCst) {
            return Err(SubstrateError::Transport("not connected".to_owned()));
        }
        if !self.inner.session_open.load(Ordering::SeqCst) {
            return Err(SubstrateError::SessionClosed);
        }
        Ok(())
    }

    fn read_attribute(&self, item: &ReadItem) -> DataValue {
        let Some(node) = self.inner.space.node(item.node_id) else {
            return DataValue::bad(StatusCode::BadNodeIdUnknown);
        };
        match item.attribute {
            Attribute::NodeClass => {
                DataValue::good(Value::Int32(node.node_class() as i32), None)
            }
            Attribute::BrowseName => {
                DataValue::good(Value::Text(node.browse_name().to_owned()), None)
            }
            Attribute::DisplayName => {
                DataValue::good(Value::Text(node.display_name().to_owned()), None)
            }
            Attribute::Value => match node {
                Node::Variable { binding, .. } => match binding {
                    NodeBinding::Static(value) => DataValue::good(value.clone(), None),
                    NodeBinding::Field(field) => {
                        match self.inner.store.read_with_stamp(&field.module_key, &field.field) {
                            Ok((value, stamp)) => DataValue::good(value, Some(stamp)),
                            Err(err) => DataValue::bad(store_status(&err)),
                        }
                    }
                },
                Node::Object { .. } | Node::Method { .. } => {
                    DataValue::bad(StatusCode::BadAttributeIdInvalid)
                }
            },
        }
    }

    fn write_value(&self, item: &WriteItem) -> StatusCode {
        let Some(node) = self.inner.space.node(item.node_id) else {
            return StatusCode::BadNodeIdUnknown;
        };
        match node {
            Node::Variable { binding: NodeBinding::Field(field), .. } => {
                match field.write(&self.inner.store, item.value.clone()) {
                    Ok(()) => StatusCode::Good,
                    Err(err) => store_status(&err),
                }
            }
            // Static variables and non-variables have no writable value.
            _ => StatusCode::BadNotWritable,
        }
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::ConstraintViolation { .. } => StatusCode::BadOutOfRange,
        StoreError::TypeMismatch { .. } => StatusCode::BadTypeMismatch,
        StoreError::UnknownField { .. } => StatusCode::BadNodeIdUnknown,
        StoreError::DuplicateField { .. } => StatusCode::BadInvalidArgument,
    }
}

fn dispatch_status(err: &DispatchError) -> StatusCode {
    match err {
        DispatchError::UnknownMethod(_) => StatusCode::BadMethodInvalid,
        DispatchError::ArgumentCount { .. } => StatusCode::BadInvalidArgument,
        DispatchError::Store(store_err) => store_status(store_err),
    }
}

#[async_trait]
impl Substrate for InProcessSubstrate {
    async fn connect(&self) -> Result<()> {
        self.inner.connected.store(true, Ordering::SeqCst);
        debug!("in-process substrate connected");
        Ok(())
    }

    async fn create_session(&self) -> Result<()> {
        if !self.inner.connected.load(Ordering::SeqCst) {
            return Err(SubstrateError::Transport("not connected".to_owned()));
        }
        self.inner.session_open.store(true, Ordering::SeqCst);
        debug!("session opened");
        Ok(())
    }

    async fn browse(&self, node_id: NodeId) -> Result<Vec<ReferenceDescription>> {
        self.ensure_session()?;
        if !self.inner.browse_enabled {
            return Err(SubstrateError::Transport(
                "browse service unavailable".to_owned(),
            ));
        }
        Ok(self
            .inner
            .space
            .browse(node_id)
            .into_iter()
            .map(|child| ReferenceDescription {
                node_id: child.node_id,
                browse_name: child.browse_name,
                display_name: child.display_name,
                node_class: child.node_class,
            })
            .collect())
    }

    async fn read(&self, items: &[ReadItem]) -> Result<Vec<DataValue>> {
        self.ensure_session()?;
        Ok(items.iter().map(|item| self.read_attribute(item)).collect())
    }

    async fn write(&self, items: &[WriteItem]) -> Result<Vec<StatusCode>> {
        self.ensure_session()?;
        Ok(items.iter().map(|item| self.write_value(item)).collect())
    }

    async fn call(
        &self,
        object_id: NodeId,
        method_id: NodeId,
        args: &[Value],
    ) -> Result<StatusCode> {
        self.ensure_session()?;
        if self.inner.space.node(object_id).is_none() {
            return Ok(StatusCode::BadNodeIdUnknown);
        }
        let Some(Node::Method { browse_name, module_key, .. }) = self.inner.space.node(method_id)
        else {
            return Ok(StatusCode::BadMethodInvalid);
        };
        if !self.inner.space.is_child_of(object_id, method_id) {
            return Ok(StatusCode::BadMethodInvalid);
        }
        match self.inner.dispatcher.dispatch(module_key, browse_name, args) {
            Ok(()) => Ok(StatusCode::Good),
            Err(err) => {
                debug!(method = %browse_name, module = %module_key, error = %err, "call rejected");
                Ok(dispatch_status(&err))
            }
        }
    }

    async fn subscribe(&self, node_id: NodeId, options: SubscribeOptions) -> Result<Monitor> {
        self.ensure_session()?;
        let Some(Node::Variable { binding: NodeBinding::Field(field), .. }) =
            self.inner.space.node(node_id)
        else {
            let status = if self.inner.space.node(node_id).is_none() {
                StatusCode::BadNodeIdUnknown
            } else {
                StatusCode::BadAttributeIdInvalid
            };
            return Err(SubstrateError::NotMonitorable(node_id, status));
        };
        let field = field.clone();
        let inner = Arc::clone(&self.inner);
        let queue_size = options.queue_size.max(1);
        // Capacity 1 keeps the channel a pure handoff, so `pending` is the
        // one bounded queue and discard-oldest governs everything buffered.
        let (tx, rx) = mpsc::channel(1);

        let sampler = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(options.sampling_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // Bounded local queue; when full the oldest sample is discarded.
            let mut pending: VecDeque<Notification> = VecDeque::new();
            let mut last_stamp: Option<DateTime<Utc>> = None;
            loop {
                ticker.tick().await;
                if !inner.session_open.load(Ordering::SeqCst) {
                    return;
                }
                let Ok((value, stamp)) =
                    inner.store.read_with_stamp(&field.module_key, &field.field)
                else {
                    return;
                };
                if last_stamp.map_or(true, |prev| stamp > prev) {
                    last_stamp = Some(stamp);
                    if pending.len() == queue_size {
                        pending.pop_front();
                        trace!(node = %node_id, "oldest queued sample discarded");
                    }
                    pending.push_back(Notification {
                        node_id,
                        value,
                        source_timestamp: stamp,
                    });
                }
                while let Some(notification) = pending.pop_front() {
                    match tx.try_send(notification) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(notification)) => {
                            pending.push_front(notification);
                            break;
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => return,
                    }
                }
            }
        });

        Ok(Monitor::new(node_id, rx, sampler))
    }

    async fn close_session(&self) -> Result<()> {
        self.inner.session_open.store(false, Ordering::SeqCst);
        debug!("session closed");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.inner.session_open.store(false, Ordering::SeqCst);
        self.inner.connected.store(false, Ordering::SeqCst);
        debug!("in-process substrate disconnected");
        Ok(())
    }
}
