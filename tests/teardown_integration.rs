//! ---
//! pms_section: "07-testing"
//! pms_subsection: "integration-tests"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Ordered teardown keeps going past failing steps."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use r_pms_client::ClientSession;
use r_pms_common::config::AppConfig;
use r_pms_model::{NodeId, Value};
use r_pms_substrate::{
    DataValue, Monitor, ReadItem, ReferenceDescription, Station, StatusCode, SubscribeOptions,
    Substrate, SubstrateError, WriteItem,
};

/// Delegating substrate whose `close_session` always fails, for exercising
/// the best-effort teardown path.
struct FlakyClose<S: Substrate> {
    inner: S,
    close_attempted: Arc<AtomicUsize>,
    disconnected: Arc<AtomicBool>,
}

#[async_trait]
impl<S: Substrate> Substrate for FlakyClose<S> {
    async fn connect(&self) -> Result<(), SubstrateError> {
        self.inner.connect().await
    }

    async fn create_session(&self) -> Result<(), SubstrateError> {
        self.inner.create_session().await
    }

    async fn browse(&self, node_id: NodeId) -> Result<Vec<ReferenceDescription>, SubstrateError> {
        self.inner.browse(node_id).await
    }

    async fn read(&self, items: &[ReadItem]) -> Result<Vec<DataValue>, SubstrateError> {
        self.inner.read(items).await
    }

    async fn write(&self, items: &[WriteItem]) -> Result<Vec<StatusCode>, SubstrateError> {
        self.inner.write(items).await
    }

    async fn call(
        &self,
        object_id: NodeId,
        method_id: NodeId,
        args: &[Value],
    ) -> Result<StatusCode, SubstrateError> {
        self.inner.call(object_id, method_id, args).await
    }

    async fn subscribe(
        &self,
        node_id: NodeId,
        options: SubscribeOptions,
    ) -> Result<Monitor, SubstrateError> {
        self.inner.subscribe(node_id, options).await
    }

    async fn close_session(&self) -> Result<(), SubstrateError> {
        self.close_attempted.fetch_add(1, Ordering::SeqCst);
        Err(SubstrateError::Transport("session endpoint gone".to_owned()))
    }

    async fn disconnect(&self) -> Result<(), SubstrateError> {
        self.disconnected.store(true, Ordering::SeqCst);
        self.inner.disconnect().await
    }
}

#[tokio::test]
async fn shutdown_reaches_disconnect_despite_a_failing_close() {
    let station = Station::build(AppConfig::default()).expect("station");
    let close_attempted = Arc::new(AtomicUsize::new(0));
    let disconnected = Arc::new(AtomicBool::new(false));
    let substrate = FlakyClose {
        inner: station.substrate(),
        close_attempted: close_attempted.clone(),
        disconnected: disconnected.clone(),
    };

    let session = ClientSession::new(substrate);
    session.open().await.expect("open");
    session.shutdown(None).await;

    assert_eq!(close_attempted.load(Ordering::SeqCst), 1);
    assert!(disconnected.load(Ordering::SeqCst));
}

#[tokio::test]
async fn shutdown_terminates_watches_before_the_session() {
    let mut config = AppConfig::default();
    config.client.sampling_interval = std::time::Duration::from_millis(10);
    let station = Station::build(config.clone()).expect("station");
    let session = ClientSession::new(station.substrate());
    session.open().await.expect("open");

    let catalog = r_pms_client::Discoverer::new(session.substrate(), &config.client)
        .run()
        .await
        .expect("discover");
    let variables: Vec<_> = catalog.variables().cloned().collect();
    let watches = r_pms_client::watch_variables(session.substrate(), &variables, &config.client)
        .await
        .expect("watch");

    let substrate = station.substrate();
    session.shutdown(Some(watches)).await;

    // Everything is down afterwards: the transport refuses further reads.
    assert!(matches!(
        substrate.read(&[ReadItem::value(NodeId::new(1, 1012))]).await,
        Err(SubstrateError::Transport(_))
    ));
}
