//! ---
//! pms_section: "05-substrate"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Placeholder networked substrate backend."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use async_trait::async_trait;
use r_pms_model::{NodeId, Value};
use tracing::warn;

use crate::api::{
    DataValue, Monitor, ReadItem, ReferenceDescription, StatusCode, SubscribeOptions, Substrate,
    WriteItem,
};
use crate::{Result, SubstrateError};

/// Networked substrate backend.
///
/// The wire protocol is not implemented yet; every operation fails with
/// `NotImplemented` so callers degrade the same way they would on a dead
/// endpoint. The console accepts an endpoint flag today so deployments can
/// pin their topology before the transport lands.
#[derive(Debug, Clone)]
pub struct RemoteSubstrate {
    endpoint: String,
}

impl RemoteSubstrate {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        warn!(%endpoint, "remote substrate selected; transport is not implemented");
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Substrate for RemoteSubstrate {
    async fn connect(&self) -> Result<()> {
        Err(SubstrateError::NotImplemented("remote connect"))
    }

    async fn create_session(&self) -> Result<()> {
        Err(SubstrateError::NotImplemented("remote create_session"))
    }

    async fn browse(&self, _node_id: NodeId) -> Result<Vec<ReferenceDescription>> {
        Err(SubstrateError::NotImplemented("remote browse"))
    }

    async fn read(&self, _items: &[ReadItem]) -> Result<Vec<DataValue>> {
        Err(SubstrateError::NotImplemented("remote read"))
    }

    async fn write(&self, _items: &[WriteItem]) -> Result<Vec<StatusCode>> {
        Err(SubstrateError::NotImplemented("remote write"))
    }

    async fn call(
        &self,
        _object_id: NodeId,
        _method_id: NodeId,
        _args: &[Value],
    ) -> Result<StatusCode> {
        Err(SubstrateError::NotImplemented("remote call"))
    }

    async fn subscribe(&self, _node_id: NodeId, _options: SubscribeOptions) -> Result<Monitor> {
        Err(SubstrateError::NotImplemented("remote subscribe"))
    }

    async fn close_session(&self) -> Result<()> {
        Err(SubstrateError::NotImplemented("remote close_session"))
    }

    async fn disconnect(&self) -> Result<()> {
        Err(SubstrateError::NotImplemented("remote disconnect"))
    }
}
