//! ---
//! pms_section: "07-testing"
//! pms_subsection: "integration-tests"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Discovery fallback when the browse service is unavailable."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use std::time::Duration;

use r_pms_client::{ClientSession, Discoverer, MethodInvoker};
use r_pms_common::config::AppConfig;
use r_pms_model::{NodeClass, NodeId};
use r_pms_substrate::Station;

fn single_module_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.modules = AppConfig::default_modules().into_iter().take(1).collect();
    config.client.settle_delay = Duration::from_millis(0);
    config
}

#[tokio::test]
async fn probing_recovers_the_commissioned_nodes() {
    let config = single_module_config();
    let station = Station::build_without_browse(config.clone()).expect("station");
    let session = ClientSession::new(station.substrate());
    session.open().await.expect("open");

    let catalog = Discoverer::new(session.substrate(), &config.client)
        .run()
        .await
        .expect("discover");

    // Gateway object and its two identity variables, plus the single base
    // module block: 1011..=1016 answer, the rest of the range stays silent.
    assert_eq!(catalog.objects().count(), 2);
    assert_eq!(catalog.variables().count(), 4);
    assert_eq!(catalog.methods().count(), 0);
    assert!(catalog
        .nodes()
        .iter()
        .all(|n| (1011..=1016).contains(&n.node_id.id)));
    assert!(catalog.nodes().iter().all(|n| n.parent.is_none()));

    let gateway = catalog.get(NodeId::new(1, 1011)).expect("gateway");
    assert_eq!(gateway.node_class, NodeClass::Object);
    assert_eq!(gateway.browse_name, "StationGateway");

    session.shutdown(None).await;
}

#[tokio::test]
async fn probed_catalogs_still_support_watching() {
    let mut config = single_module_config();
    config.client.sampling_interval = Duration::from_millis(10);
    let station = Station::build_without_browse(config.clone()).expect("station");
    let session = ClientSession::new(station.substrate());
    session.open().await.expect("open");

    let catalog = Discoverer::new(session.substrate(), &config.client)
        .run()
        .await
        .expect("discover");
    let variables: Vec<_> = catalog.variables().cloned().collect();
    let watches = r_pms_client::watch_variables(session.substrate(), &variables, &config.client)
        .await
        .expect("watch");
    // Static gateway identity variables refuse a watch; the module's two
    // live variables accept one.
    assert_eq!(watches.len(), 2);

    session.shutdown(Some(watches)).await;
}

#[tokio::test]
async fn methods_are_not_exercised_without_discovered_methods() {
    let config = single_module_config();
    let station = Station::build_without_browse(config.clone()).expect("station");
    let session = ClientSession::new(station.substrate());
    session.open().await.expect("open");

    let catalog = Discoverer::new(session.substrate(), &config.client)
        .run()
        .await
        .expect("discover");
    let outcomes = MethodInvoker::new(session.substrate(), &config.client)
        .exercise(&catalog)
        .await
        .expect("exercise");
    assert!(outcomes.is_empty());

    session.shutdown(None).await;
}
