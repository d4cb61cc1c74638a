//! The resource graph handed to the provisioning engine.
//!
//! Nodes are kept in build order inside a `petgraph` graph whose edges point
//! from a dependency to its dependent, so topological sort yields
//! dependencies first. A graph is immutable once built; later pipeline
//! stages extend a copy and return a new value.

use std::collections::BTreeMap;
use std::fmt;

use petgraph::graph::NodeIndex;
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};
use sha2::{Digest, Sha256};

use stackplan_common::error::{PlanError, Result};
use stackplan_common::types::Handle;

/// Kind of a provisioning node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// The virtual network.
    Network,
    /// The orchestration cluster.
    Cluster,
    /// A task definition.
    TaskSpec,
    /// The container entry of a task definition.
    ContainerSpec,
    /// A running service bound to a cluster and task definition.
    ServiceInstance,
    /// The shared load balancer.
    LoadBalancer,
    /// The load balancer's listener.
    Listener,
    /// A target group forwarding to one service.
    TargetGroup,
    /// A path-pattern rule on the listener.
    RoutingRule,
    /// The alias record pointing at the load balancer.
    DnsRecord,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Network => "network",
            Self::Cluster => "cluster",
            Self::TaskSpec => "task-spec",
            Self::ContainerSpec => "container-spec",
            Self::ServiceInstance => "service-instance",
            Self::LoadBalancer => "load-balancer",
            Self::Listener => "listener",
            Self::TargetGroup => "target-group",
            Self::RoutingRule => "routing-rule",
            Self::DnsRecord => "dns-record",
        };
        f.write_str(s)
    }
}

/// A container port mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortMapping {
    /// Port the container listens on.
    pub container_port: u16,
    /// Transport protocol.
    pub protocol: String,
}

/// Attributes needed to materialize one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "attributes", rename_all = "kebab-case")]
pub enum Resource {
    /// The virtual network.
    Network {
        /// Address space in CIDR notation.
        cidr: String,
        /// Availability zones spanned.
        max_azs: u8,
    },
    /// The orchestration cluster.
    Cluster {
        /// Display name.
        name: String,
    },
    /// A task definition.
    TaskSpec {
        /// Task family, the owning service's name.
        family: String,
        /// CPU units.
        cpu_units: u32,
        /// Memory in MiB.
        memory_mib: u32,
        /// Network mode.
        network_mode: String,
        /// Launch compatibility.
        compatibility: String,
    },
    /// The container entry of a task definition.
    ContainerSpec {
        /// Task definition node owning the container.
        task: String,
        /// Image repository handle.
        image: Handle,
        /// Image tag.
        tag: String,
        /// Hard memory limit in MiB.
        memory_limit_mib: u32,
        /// Exposed ports.
        port_mappings: Vec<PortMapping>,
    },
    /// A service instance.
    ServiceInstance {
        /// Service name.
        service_name: String,
        /// Cluster node.
        cluster: String,
        /// Task definition node.
        task: String,
        /// Port traffic is delivered to.
        container_port: u16,
    },
    /// The shared load balancer.
    LoadBalancer {
        /// Load balancer name.
        name: String,
        /// Whether it gets a public address.
        internet_facing: bool,
    },
    /// The listener.
    Listener {
        /// Port traffic is accepted on.
        port: u16,
        /// Listener protocol.
        protocol: String,
        /// Whether any source address may connect.
        open: bool,
        /// Target group receiving unmatched requests, if any.
        default_target_group: Option<String>,
    },
    /// A target group.
    TargetGroup {
        /// Target group name.
        name: String,
        /// Protocol used towards the targets.
        protocol: String,
        /// Port on the targets traffic is sent to.
        port: u16,
        /// Service instance node registered as target.
        target: String,
    },
    /// A path-pattern routing rule.
    RoutingRule {
        /// Listener node the rule belongs to.
        listener: String,
        /// Evaluation priority, lower first.
        priority: u32,
        /// Path pattern condition.
        path_pattern: String,
        /// Target group node receiving matching requests.
        target_group: String,
    },
    /// An alias record.
    DnsRecord {
        /// Hosted zone.
        zone: Handle,
        /// Fully qualified record name.
        fqdn: String,
        /// Record type.
        record_type: String,
        /// Alias target.
        target: Handle,
        /// TTL in seconds.
        ttl_seconds: u32,
        /// Record comment.
        comment: Option<String>,
    },
}

impl Resource {
    /// Returns the node kind for these attributes.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Network { .. } => NodeKind::Network,
            Self::Cluster { .. } => NodeKind::Cluster,
            Self::TaskSpec { .. } => NodeKind::TaskSpec,
            Self::ContainerSpec { .. } => NodeKind::ContainerSpec,
            Self::ServiceInstance { .. } => NodeKind::ServiceInstance,
            Self::LoadBalancer { .. } => NodeKind::LoadBalancer,
            Self::Listener { .. } => NodeKind::Listener,
            Self::TargetGroup { .. } => NodeKind::TargetGroup,
            Self::RoutingRule { .. } => NodeKind::RoutingRule,
            Self::DnsRecord { .. } => NodeKind::DnsRecord,
        }
    }
}

/// One provisioning node and its declared dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceNode {
    id: String,
    depends_on: Vec<String>,
    #[serde(flatten)]
    resource: Resource,
}

impl ResourceNode {
    /// Returns the node id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the node kind.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.resource.kind()
    }

    /// Returns the node's attributes.
    #[must_use]
    pub const fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Returns the ids of the nodes that must exist before this one.
    #[must_use]
    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }
}

/// An immutable, acyclic set of provisioning nodes.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    graph: petgraph::Graph<ResourceNode, ()>,
    index: BTreeMap<String, NodeIndex>,
}

impl ResourceGraph {
    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Iterates over nodes in build order.
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.graph.node_weights()
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&ResourceNode> {
        self.index
            .get(id)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    /// Returns true if a node with this id exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Iterates over nodes of one kind in build order.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &ResourceNode> {
        self.nodes().filter(move |n| n.kind() == kind)
    }

    /// Returns the ids of nodes that directly depend on `id`.
    #[must_use]
    pub fn dependents(&self, id: &str) -> Vec<&str> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut dependents: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .collect();
        dependents.sort_unstable();
        dependents
            .into_iter()
            .filter_map(|i| self.graph.node_weight(i).map(ResourceNode::id))
            .collect()
    }

    /// Returns a deployment order in which every node follows its dependencies.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph contains cycles.
    pub fn deployment_order(&self) -> Result<Vec<&str>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).map(ResourceNode::id))
                .collect()),
            Err(_cycle) => Err(PlanError::Config {
                message: "cyclic dependency detected in resource graph".into(),
            }),
        }
    }

    /// Serializes the graph as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serializes the graph as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| PlanError::Config {
            message: format!("cannot render plan as YAML: {e}"),
        })
    }

    /// Returns the SHA-256 of the canonical JSON form, hex encoded.
    ///
    /// Two graphs with the same fingerprint materialize identically.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn fingerprint(&self) -> Result<String> {
        let canonical = serde_json::to_vec(self)?;
        Ok(format!("{:x}", Sha256::digest(&canonical)))
    }
}

impl PartialEq for ResourceGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes().eq(other.nodes())
    }
}

impl Eq for ResourceGraph {}

impl Serialize for ResourceGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let nodes: Vec<&ResourceNode> = self.nodes().collect();
        let mut state = serializer.serialize_struct("ResourceGraph", 1)?;
        state.serialize_field("nodes", &nodes)?;
        state.end()
    }
}

/// Mutable staging area used while a pipeline stage adds nodes.
///
/// Dependencies must already be present, so edges always point at
/// earlier nodes and the result is acyclic.
#[derive(Debug, Default)]
pub(crate) struct GraphBuilder {
    graph: ResourceGraph,
}

impl GraphBuilder {
    /// Starts an empty graph.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Starts from a copy of an existing graph.
    pub(crate) fn extend(graph: &ResourceGraph) -> Self {
        Self {
            graph: graph.clone(),
        }
    }

    /// Returns true if a node with this id has been added.
    pub(crate) fn contains(&self, id: &str) -> bool {
        self.graph.contains(id)
    }

    /// Adds a node depending on the already-present nodes `depends_on`.
    pub(crate) fn add(
        &mut self,
        id: impl Into<String>,
        resource: Resource,
        depends_on: &[&str],
    ) -> Result<()> {
        let id = id.into();
        if self.graph.index.contains_key(&id) {
            return Err(PlanError::Config {
                message: format!("resource id \"{id}\" is planned twice"),
            });
        }
        let mut edges = Vec::with_capacity(depends_on.len());
        for dep in depends_on {
            let idx = self.graph.index.get(*dep).copied().ok_or_else(|| PlanError::Config {
                message: format!("resource \"{id}\" depends on unknown resource \"{dep}\""),
            })?;
            edges.push(idx);
        }

        tracing::debug!(id = %id, kind = %resource.kind(), deps = ?depends_on, "planning resource");
        let node = ResourceNode {
            id: id.clone(),
            depends_on: depends_on.iter().map(|d| (*d).to_string()).collect(),
            resource,
        };
        let idx = self.graph.graph.add_node(node);
        for dep in edges {
            let _ = self.graph.graph.add_edge(dep, idx, ());
        }
        let _ = self.graph.index.insert(id, idx);
        Ok(())
    }

    /// Freezes the graph.
    pub(crate) fn finish(self) -> ResourceGraph {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network() -> Resource {
        Resource::Network {
            cidr: "10.0.0.0/16".into(),
            max_azs: 2,
        }
    }

    fn cluster(name: &str) -> Resource {
        Resource::Cluster { name: name.into() }
    }

    #[test]
    fn empty_graph_resolves_to_empty() {
        let graph = GraphBuilder::new().finish();
        assert!(graph.is_empty());
        let order = graph.deployment_order().expect("should resolve");
        assert!(order.is_empty());
    }

    #[test]
    fn dependencies_come_first_in_deployment_order() {
        let mut builder = GraphBuilder::new();
        builder.add("network", network(), &[]).expect("network");
        builder
            .add("cluster", cluster("Services"), &["network"])
            .expect("cluster");
        let graph = builder.finish();

        let order = graph.deployment_order().expect("should resolve");
        assert_eq!(order, vec!["network", "cluster"]);
        assert_eq!(graph.dependents("network"), vec!["cluster"]);
        assert!(graph.dependents("cluster").is_empty());
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let mut builder = GraphBuilder::new();
        let err = builder
            .add("cluster", cluster("Services"), &["network"])
            .unwrap_err();
        assert!(err.to_string().contains("unknown resource"), "got: {err}");
        assert!(!builder.contains("cluster"));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut builder = GraphBuilder::new();
        builder.add("network", network(), &[]).expect("network");
        let err = builder.add("network", network(), &[]).unwrap_err();
        assert!(err.to_string().contains("planned twice"), "got: {err}");
    }

    #[test]
    fn extending_leaves_original_untouched() {
        let mut builder = GraphBuilder::new();
        builder.add("network", network(), &[]).expect("network");
        let base = builder.finish();

        let mut extended = GraphBuilder::extend(&base);
        extended
            .add("cluster", cluster("Services"), &["network"])
            .expect("cluster");
        let extended = extended.finish();

        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 2);
        assert_ne!(base, extended);
    }

    #[test]
    fn serialized_nodes_carry_kind_and_attributes() {
        let mut builder = GraphBuilder::new();
        builder.add("network", network(), &[]).expect("network");
        builder
            .add("cluster", cluster("Services"), &["network"])
            .expect("cluster");
        let graph = builder.finish();

        let json: serde_json::Value =
            serde_json::from_str(&graph.to_json().expect("json")).expect("parse");
        let nodes = json["nodes"].as_array().expect("nodes array");
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1]["id"], "cluster");
        assert_eq!(nodes[1]["kind"], "cluster");
        assert_eq!(nodes[1]["depends_on"][0], "network");
        assert_eq!(nodes[1]["attributes"]["name"], "Services");
    }

    #[test]
    fn fingerprint_tracks_content() {
        let build = |name: &str| {
            let mut builder = GraphBuilder::new();
            builder.add("network", network(), &[]).expect("network");
            builder
                .add("cluster", cluster(name), &["network"])
                .expect("cluster");
            builder.finish()
        };
        let a = build("Services").fingerprint().expect("fingerprint");
        let b = build("Services").fingerprint().expect("fingerprint");
        let c = build("Other").fingerprint().expect("fingerprint");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
