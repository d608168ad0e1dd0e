//! ---
//! pms_section: "06-client"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Exercises discovered alarm methods after discovery settles."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use r_pms_common::config::ClientConfig;
use r_pms_model::{NodeId, Value};
use r_pms_substrate::{StatusCode, Substrate};
use tracing::{info, warn};

use crate::discovery::{Catalog, DiscoveredNode};
use crate::Result;

/// Outcome of one method invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationOutcome {
    pub object_id: NodeId,
    pub method_id: NodeId,
    pub method_name: String,
    pub status: StatusCode,
}

/// Exercises the discovered alarm methods.
///
/// After discovery settles, the invoker calls up to the configured number of
/// methods once each with demonstration arguments. A rejected call is logged
/// and reported; there are no retries.
pub struct MethodInvoker<'a, S: Substrate> {
    substrate: &'a S,
    config: &'a ClientConfig,
}

impl<'a, S: Substrate> MethodInvoker<'a, S> {
    pub fn new(substrate: &'a S, config: &'a ClientConfig) -> Self {
        Self { substrate, config }
    }

    /// Wait out the settle delay, then invoke the discovered methods.
    pub async fn exercise(&self, catalog: &Catalog) -> Result<Vec<InvocationOutcome>> {
        tokio::time::sleep(self.config.settle_delay).await;

        let mut outcomes = Vec::new();
        for method in catalog.methods().take(self.config.max_method_invocations) {
            let Some(object_id) = owner_of(catalog, method) else {
                warn!(method = %method.node_id, name = %method.browse_name, "owning object unresolved, skipped");
                continue;
            };
            let args = demonstration_args(&method.browse_name);
            let status = self
                .substrate
                .call(object_id, method.node_id, &args)
                .await?;
            if status.is_good() {
                info!(method = %method.browse_name, object = %object_id, "method invoked");
            } else {
                warn!(method = %method.browse_name, object = %object_id, %status, "method rejected");
            }
            outcomes.push(InvocationOutcome {
                object_id,
                method_id: method.node_id,
                method_name: method.browse_name.clone(),
                status,
            });
        }
        Ok(outcomes)
    }
}

/// Arguments used when exercising a method: activate the alarm, and for the
/// leveled variant pick a mid-range sound level.
fn demonstration_args(method_name: &str) -> Vec<Value> {
    if method_name.contains("WithLevel") {
        vec![Value::Boolean(true), Value::Double(85.0)]
    } else {
        vec![Value::Boolean(true)]
    }
}

/// Resolve the object a method belongs to.
///
/// Traversal records the owning object directly. Probe-found methods have no
/// parent, so the identifier rendering is matched against the discovered
/// objects as a last resort.
fn owner_of(catalog: &Catalog, method: &DiscoveredNode) -> Option<NodeId> {
    if let Some(parent) = method.parent {
        return Some(parent);
    }
    let method_id = method.node_id.to_string();
    catalog
        .objects()
        .find(|object| method_id.contains(&object.node_id.to_string()))
        .map(|object| object.node_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use r_pms_address_space::build_station;
    use r_pms_common::config::AppConfig;
    use r_pms_model::{fields, NodeClass};
    use r_pms_store::{MethodDispatcher, VariableStore};
    use r_pms_substrate::InProcessSubstrate;

    use crate::discovery::Discoverer;

    #[tokio::test]
    async fn exercise_activates_the_discovered_alarms() {
        let mut config = AppConfig::default();
        config.client.settle_delay = Duration::from_millis(0);
        config.client.max_method_invocations = 6;

        let store = Arc::new(VariableStore::new());
        let station = build_station(&config, &store).expect("build station");
        let dispatcher = MethodDispatcher::new(store.clone());
        let substrate = InProcessSubstrate::new(station.space, store.clone(), dispatcher);
        substrate.connect().await.expect("connect");
        substrate.create_session().await.expect("session");

        let catalog = Discoverer::new(&substrate, &config.client)
            .run()
            .await
            .expect("discover");
        let outcomes = MethodInvoker::new(&substrate, &config.client)
            .exercise(&catalog)
            .await
            .expect("exercise");

        assert_eq!(outcomes.len(), 6);
        assert!(outcomes.iter().all(|o| o.status.is_good()));
        // Every module's alarm is now active; the leveled ones committed 85 dB.
        assert_eq!(
            store.read("base_module_001", fields::ALARM_ACTIVE).expect("read"),
            Value::Boolean(true)
        );
        assert_eq!(
            store.read("advanced_module_001", fields::SOUND_LEVEL).expect("read"),
            Value::Double(85.0)
        );
    }

    #[tokio::test]
    async fn invocation_cap_limits_the_run() {
        let mut config = AppConfig::default();
        config.client.settle_delay = Duration::from_millis(0);
        config.client.max_method_invocations = 2;

        let store = Arc::new(VariableStore::new());
        let station = build_station(&config, &store).expect("build station");
        let dispatcher = MethodDispatcher::new(store.clone());
        let substrate = InProcessSubstrate::new(station.space, store, dispatcher);
        substrate.connect().await.expect("connect");
        substrate.create_session().await.expect("session");

        let catalog = Discoverer::new(&substrate, &config.client)
            .run()
            .await
            .expect("discover");
        let outcomes = MethodInvoker::new(&substrate, &config.client)
            .exercise(&catalog)
            .await
            .expect("exercise");
        assert_eq!(outcomes.len(), 2);
    }

    #[test]
    fn owner_prefers_the_traversal_parent() {
        let mut catalog = Catalog::new();
        catalog.insert(DiscoveredNode {
            node_id: NodeId::new(1, 1014),
            browse_name: "BaseModule_001".to_owned(),
            display_name: "Base Module 001".to_owned(),
            node_class: NodeClass::Object,
            depth: 0,
            parent: None,
        });
        let method = DiscoveredNode {
            node_id: NodeId::new(1, 5000),
            browse_name: "SetAlarm".to_owned(),
            display_name: "SetAlarm".to_owned(),
            node_class: NodeClass::Method,
            depth: 0,
            parent: None,
        };
        assert_eq!(owner_of(&catalog, &method), None);

        let traversed = DiscoveredNode {
            parent: Some(NodeId::new(1, 1014)),
            ..method
        };
        assert_eq!(owner_of(&catalog, &traversed), Some(NodeId::new(1, 1014)));
    }
}
