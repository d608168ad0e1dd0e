//! ---
//! pms_section: "06-client"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Change watches over discovered variables and value rendering."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use r_pms_common::config::ClientConfig;
use r_pms_model::{fields, NodeId, SystemState, Value};
use r_pms_substrate::{Notification, SubscribeOptions, Substrate};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::discovery::DiscoveredNode;
use crate::Result;

/// Render a sampled value the way the operator console displays it.
///
/// Known sensor fields get their unit; everything else falls back to the
/// value's plain form.
pub fn render_value(browse_name: &str, value: &Value) -> String {
    match (browse_name, value) {
        (fields::SYSTEM_STATE, Value::Int32(raw)) => match SystemState::from_i32(*raw) {
            Some(state) => format!("{} ({raw})", state.label()),
            None => format!("unknown ({raw})"),
        },
        (fields::TEMPERATURE, Value::Double(celsius)) => format!("{celsius:.1}°C"),
        (fields::CROWD_LEVEL, Value::Double(percent)) => format!("{percent:.1}%"),
        (_, value) => value.to_string(),
    }
}

/// One running watch: the variable it mirrors and its consumer task.
#[derive(Debug)]
struct Watch {
    node_id: NodeId,
    consumer: JoinHandle<()>,
}

/// Live change watches over a set of variables.
///
/// Each watch owns a monitored item and mirrors the newest notification into
/// a shared map, so the latest known value survives the consumer task.
#[derive(Debug)]
pub struct WatchSet {
    watches: Vec<Watch>,
    mirror: Arc<Mutex<HashMap<NodeId, Notification>>>,
}

impl WatchSet {
    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// Newest notification seen for a variable, if any arrived yet.
    pub fn latest(&self, node_id: NodeId) -> Option<Notification> {
        self.mirror.lock().get(&node_id).cloned()
    }

    /// Stop every consumer. Dropping the consumers tears their monitored
    /// items down with them.
    pub fn terminate(self) {
        for watch in &self.watches {
            watch.consumer.abort();
        }
        info!(watches = self.watches.len(), "change watches terminated");
    }
}

/// Create one change watch per discovered variable.
///
/// Variables that refuse a subscription (static gateway identity nodes, for
/// instance) are logged and skipped rather than failing the set.
pub async fn watch_variables(
    substrate: &impl Substrate,
    variables: &[DiscoveredNode],
    config: &ClientConfig,
) -> Result<WatchSet> {
    let options = SubscribeOptions {
        sampling_interval: config.sampling_interval,
        queue_size: config.queue_size,
    };
    let mirror: Arc<Mutex<HashMap<NodeId, Notification>>> = Arc::new(Mutex::new(HashMap::new()));
    let mut watches = Vec::new();

    for variable in variables {
        let mut monitor = match substrate.subscribe(variable.node_id, options).await {
            Ok(monitor) => monitor,
            Err(err) => {
                warn!(node = %variable.node_id, name = %variable.browse_name, error = %err, "watch skipped");
                continue;
            }
        };
        let browse_name = variable.browse_name.clone();
        let display_name = variable.display_name.clone();
        let node_id = variable.node_id;
        let mirror = Arc::clone(&mirror);
        let consumer = tokio::spawn(async move {
            while let Some(notification) = monitor.recv().await {
                info!(
                    node = %node_id,
                    name = %display_name,
                    value = %render_value(&browse_name, &notification.value),
                    stamp = %notification.source_timestamp,
                    "value changed"
                );
                mirror.lock().insert(node_id, notification);
            }
        });
        watches.push(Watch { node_id, consumer });
    }

    info!(watches = watches.len(), "change watches established");
    Ok(WatchSet { watches, mirror })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use r_pms_address_space::build_station;
    use r_pms_common::config::AppConfig;
    use r_pms_model::NodeClass;
    use r_pms_store::{MethodDispatcher, VariableStore};
    use r_pms_substrate::InProcessSubstrate;

    #[test]
    fn rendering_follows_the_console_rules() {
        assert_eq!(
            render_value(fields::SYSTEM_STATE, &Value::Int32(0)),
            "on (0)"
        );
        assert_eq!(
            render_value(fields::SYSTEM_STATE, &Value::Int32(2)),
            "maintenance (2)"
        );
        assert_eq!(
            render_value(fields::SYSTEM_STATE, &Value::Int32(9)),
            "unknown (9)"
        );
        assert_eq!(
            render_value(fields::TEMPERATURE, &Value::Double(22.46)),
            "22.5°C"
        );
        assert_eq!(render_value(fields::CROWD_LEVEL, &Value::Double(70.0)), "70.0%");
        assert_eq!(
            render_value("StationId", &Value::Text("STN_001".to_owned())),
            "STN_001"
        );
    }

    #[tokio::test]
    async fn watches_mirror_store_changes() {
        let config = AppConfig::default();
        let store = Arc::new(VariableStore::new());
        let station = build_station(&config, &store).expect("build station");
        let dispatcher = MethodDispatcher::new(store.clone());
        let substrate = InProcessSubstrate::new(station.space, store.clone(), dispatcher);
        substrate.connect().await.expect("connect");
        substrate.create_session().await.expect("session");

        let state_node = DiscoveredNode {
            node_id: NodeId::new(1, 1015),
            browse_name: fields::SYSTEM_STATE.to_owned(),
            display_name: fields::SYSTEM_STATE.to_owned(),
            node_class: NodeClass::Variable,
            depth: 3,
            parent: Some(NodeId::new(1, 1014)),
        };
        let client = ClientConfig {
            sampling_interval: Duration::from_millis(20),
            ..ClientConfig::default()
        };
        let watches = watch_variables(&substrate, std::slice::from_ref(&state_node), &client)
            .await
            .expect("watch");
        assert_eq!(watches.len(), 1);

        store
            .write("base_module_001", fields::SYSTEM_STATE, Value::Int32(1))
            .expect("write");
        tokio::time::sleep(Duration::from_millis(120)).await;

        let latest = watches.latest(state_node.node_id).expect("notification");
        assert_eq!(latest.value, Value::Int32(1));
        watches.terminate();
    }
}
