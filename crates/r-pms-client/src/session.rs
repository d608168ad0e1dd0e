//! ---
//! pms_section: "06-client"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Client session lifecycle and ordered best-effort teardown."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use r_pms_substrate::Substrate;
use tracing::{info, warn};

use crate::monitor::WatchSet;
use crate::Result;

/// A client's connection to one station.
///
/// Teardown is ordered and best-effort: watches first, then the session,
/// then the transport. A failing step is logged and the remaining steps
/// still run, so a dead session never leaks a connection.
pub struct ClientSession<S: Substrate> {
    substrate: S,
}

impl<S: Substrate> ClientSession<S> {
    pub fn new(substrate: S) -> Self {
        Self { substrate }
    }

    /// Connect the transport and open a session.
    pub async fn open(&self) -> Result<()> {
        self.substrate.connect().await?;
        self.substrate.create_session().await?;
        info!("client session open");
        Ok(())
    }

    pub fn substrate(&self) -> &S {
        &self.substrate
    }

    /// Tear everything down in order: watches, session, transport.
    pub async fn shutdown(self, watches: Option<WatchSet>) {
        if let Some(watches) = watches {
            watches.terminate();
        }
        if let Err(err) = self.substrate.close_session().await {
            warn!(error = %err, "close_session failed, continuing teardown");
        }
        if let Err(err) = self.substrate.disconnect().await {
            warn!(error = %err, "disconnect failed");
        }
        info!("client session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use r_pms_address_space::build_station;
    use r_pms_common::config::AppConfig;
    use r_pms_model::NodeId;
    use r_pms_store::{MethodDispatcher, VariableStore};
    use r_pms_substrate::{InProcessSubstrate, ReadItem, SubstrateError};

    #[tokio::test]
    async fn shutdown_closes_session_and_transport() {
        let config = AppConfig::default();
        let store = Arc::new(VariableStore::new());
        let station = build_station(&config, &store).expect("build station");
        let dispatcher = MethodDispatcher::new(store.clone());
        let substrate = InProcessSubstrate::new(station.space, store, dispatcher);

        let session = ClientSession::new(substrate.clone());
        session.open().await.expect("open");
        assert!(substrate
            .read(&[ReadItem::value(NodeId::new(1, 1012))])
            .await
            .is_ok());

        session.shutdown(None).await;
        assert!(matches!(
            substrate.read(&[ReadItem::value(NodeId::new(1, 1012))]).await,
            Err(SubstrateError::Transport(_))
        ));
    }
}
