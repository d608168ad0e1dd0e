//! ---
//! pms_section: "06-client"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Address-space discovery with an identifier-probe fallback."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use r_pms_common::config::ClientConfig;
use r_pms_model::{NodeClass, NodeId, Value};
use r_pms_substrate::{Attribute, ReadItem, Substrate};
use tracing::{debug, info, warn};

use crate::{ClientError, Result};

/// Well-known root container every traversal starts from.
const OBJECTS_ROOT: NodeId = NodeId::new(0, 85);

/// Protocol scaffolding names skipped during traversal. Everything under
/// these belongs to the substrate itself, not the station.
const DENY_LIST: &[&str] = &[
    "Server",
    "Types",
    "Views",
    "Aliases",
    "FolderType",
    "BaseObjectType",
];

/// Where a discovery run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryPhase {
    Idle,
    BrowsingRoot,
    BrowsingChildren,
    Fallback,
    Done,
}

/// A station node found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredNode {
    pub node_id: NodeId,
    pub browse_name: String,
    pub display_name: String,
    pub node_class: NodeClass,
    /// Distance from the Objects root; probe-found nodes report zero.
    pub depth: u32,
    /// Object this node was reached through. Probe-found nodes have none.
    pub parent: Option<NodeId>,
}

/// Deduplicated discovery result, in traversal order.
#[derive(Debug, Default)]
pub struct Catalog {
    nodes: Vec<DiscoveredNode>,
    seen: HashSet<NodeId>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a node unless its identifier was already seen.
    pub fn insert(&mut self, node: DiscoveredNode) {
        if self.seen.insert(node.node_id) {
            self.nodes.push(node);
        }
    }

    pub fn get(&self, node_id: NodeId) -> Option<&DiscoveredNode> {
        self.nodes.iter().find(|n| n.node_id == node_id)
    }

    pub fn nodes(&self) -> &[DiscoveredNode] {
        &self.nodes
    }

    pub fn objects(&self) -> impl Iterator<Item = &DiscoveredNode> {
        self.by_class(NodeClass::Object)
    }

    pub fn variables(&self) -> impl Iterator<Item = &DiscoveredNode> {
        self.by_class(NodeClass::Variable)
    }

    pub fn methods(&self) -> impl Iterator<Item = &DiscoveredNode> {
        self.by_class(NodeClass::Method)
    }

    fn by_class(&self, class: NodeClass) -> impl Iterator<Item = &DiscoveredNode> {
        self.nodes.iter().filter(move |n| n.node_class == class)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Walks a substrate's address space into a [`Catalog`].
///
/// Traversal descends object nodes breadth-last up to the configured depth,
/// skipping the deny-listed scaffolding. When the browse service fails, the
/// discoverer probes the commissioned identifier range one node at a time;
/// nodes that answer their attribute reads are taken as-is.
pub struct Discoverer<'a, S: Substrate> {
    substrate: &'a S,
    config: &'a ClientConfig,
    phase: DiscoveryPhase,
}

impl<'a, S: Substrate> Discoverer<'a, S> {
    pub fn new(substrate: &'a S, config: &'a ClientConfig) -> Self {
        Self {
            substrate,
            config,
            phase: DiscoveryPhase::Idle,
        }
    }

    pub fn phase(&self) -> DiscoveryPhase {
        self.phase
    }

    /// Run discovery to completion.
    pub async fn run(&mut self) -> Result<Catalog> {
        let mut catalog = Catalog::new();
        self.phase = DiscoveryPhase::BrowsingRoot;

        match self.substrate.browse(OBJECTS_ROOT).await {
            Ok(children) => {
                self.phase = DiscoveryPhase::BrowsingChildren;
                for child in children {
                    if DENY_LIST.contains(&child.browse_name.as_str()) {
                        debug!(node = %child.node_id, name = %child.browse_name, "skipped scaffolding");
                        continue;
                    }
                    self.descend(&mut catalog, OBJECTS_ROOT, child, 1).await?;
                }
            }
            Err(err) => {
                warn!(error = %err, "browse unavailable, probing identifier range");
                self.phase = DiscoveryPhase::Fallback;
                self.probe(&mut catalog).await?;
            }
        }

        if self.phase != DiscoveryPhase::Fallback
            && catalog.objects().count() == 0
            && catalog.variables().count() == 0
        {
            // A traversal that surfaced no objects and no variables still
            // gets the probe, in case the station hides them from browsing.
            self.phase = DiscoveryPhase::Fallback;
            self.probe(&mut catalog).await?;
        }

        self.phase = DiscoveryPhase::Done;
        if catalog.is_empty() {
            return Err(ClientError::NothingDiscovered);
        }
        info!(
            objects = catalog.objects().count(),
            variables = catalog.variables().count(),
            methods = catalog.methods().count(),
            "discovery complete"
        );
        Ok(catalog)
    }

    fn descend<'f>(
        &'f self,
        catalog: &'f mut Catalog,
        parent: NodeId,
        reference: r_pms_substrate::ReferenceDescription,
        depth: u32,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'f>> {
        Box::pin(async move {
            let node_id = reference.node_id;
            let node_class = reference.node_class;
            catalog.insert(DiscoveredNode {
                node_id,
                browse_name: reference.browse_name,
                display_name: reference.display_name,
                node_class,
                depth,
                parent: Some(parent),
            });

            if node_class == NodeClass::Object && depth < self.config.max_browse_depth {
                for child in self.substrate.browse(node_id).await? {
                    if DENY_LIST.contains(&child.browse_name.as_str()) {
                        continue;
                    }
                    self.descend(catalog, node_id, child, depth + 1).await?;
                }
            }
            Ok(())
        })
    }

    /// Read the commissioned identifier range node by node. A candidate that
    /// fails any of its attribute reads is skipped silently; there is no
    /// retry.
    async fn probe(&self, catalog: &mut Catalog) -> Result<()> {
        let namespace = self.config.probe_namespace;
        for id in self.config.probe_first..=self.config.probe_last {
            let node_id = NodeId::new(namespace, id);
            let results = self
                .substrate
                .read(&[
                    ReadItem { node_id, attribute: Attribute::NodeClass },
                    ReadItem { node_id, attribute: Attribute::BrowseName },
                    ReadItem { node_id, attribute: Attribute::DisplayName },
                ])
                .await?;
            let class = results[0]
                .value
                .as_ref()
                .and_then(Value::as_i32)
                .and_then(NodeClass::from_i32);
            let browse_name = results[1].value.as_ref().and_then(Value::as_text);
            let display_name = results[2].value.as_ref().and_then(Value::as_text);
            let (Some(class), Some(browse_name), Some(display_name)) =
                (class, browse_name, display_name)
            else {
                continue;
            };
            debug!(node = %node_id, name = %browse_name, "probe hit");
            catalog.insert(DiscoveredNode {
                node_id,
                browse_name: browse_name.to_owned(),
                display_name: display_name.to_owned(),
                node_class: class,
                depth: 0,
                parent: None,
            });
        }
        Ok(())
    }
}

/// Read the gateway identity variables commissioned at fixed identifiers.
pub async fn station_identity(
    substrate: &impl Substrate,
    config: &ClientConfig,
) -> Result<(String, String)> {
    let namespace = config.probe_namespace;
    let results = substrate
        .read(&[
            ReadItem::value(NodeId::new(namespace, 1012)),
            ReadItem::value(NodeId::new(namespace, 1013)),
        ])
        .await?;
    let id = results[0]
        .value
        .as_ref()
        .and_then(Value::as_text)
        .unwrap_or("<unknown>")
        .to_owned();
    let name = results[1]
        .value
        .as_ref()
        .and_then(Value::as_text)
        .unwrap_or("<unknown>")
        .to_owned();
    Ok((id, name))
}
