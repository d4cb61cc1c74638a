//! Topology construction.
//!
//! Lays out the network and cluster roots, then three nodes per service:
//! task definition, container, and service instance.

use stackplan_common::config::NetworkConfig;
use stackplan_common::constants;
use stackplan_common::error::{PlanError, Result};

use crate::descriptor::ServiceDescriptor;
use crate::graph::{GraphBuilder, PortMapping, Resource, ResourceGraph};
use crate::validator;

/// Id of the network node.
pub const NETWORK_NODE: &str = "network";
/// Id of the cluster node.
pub const CLUSTER_NODE: &str = "cluster";

const MAX_CLUSTER_NAME_LEN: usize = 255;

/// Builds the resource graph for `descriptors` on a new network and cluster.
///
/// Validation runs to completion before any node is created, so either
/// every node is planned or the caller gets the full list of problems.
///
/// # Errors
///
/// Returns [`PlanError::Config`] for an invalid network or cluster name and
/// [`PlanError::InvalidTopology`] if any descriptor is invalid.
pub fn build(
    network: &NetworkConfig,
    cluster_name: &str,
    descriptors: &[ServiceDescriptor],
) -> Result<ResourceGraph> {
    tracing::info!(
        cluster = cluster_name,
        services = descriptors.len(),
        "building topology"
    );
    network.validate()?;
    check_cluster_name(cluster_name)?;
    validator::validate_descriptors(descriptors)?;

    let mut graph = GraphBuilder::new();
    graph.add(
        NETWORK_NODE,
        Resource::Network {
            cidr: network.cidr.clone(),
            max_azs: network.max_azs,
        },
        &[],
    )?;
    graph.add(
        CLUSTER_NODE,
        Resource::Cluster {
            name: cluster_name.to_string(),
        },
        &[NETWORK_NODE],
    )?;

    for desc in descriptors {
        add_service(&mut graph, desc)?;
    }

    let graph = graph.finish();
    tracing::info!(nodes = graph.len(), "topology built");
    Ok(graph)
}

fn add_service(graph: &mut GraphBuilder, desc: &ServiceDescriptor) -> Result<()> {
    let task = desc.task_id();
    let container = desc.container_id();

    graph.add(
        task.as_str(),
        Resource::TaskSpec {
            family: desc.name.clone(),
            cpu_units: desc.cpu_units,
            memory_mib: desc.memory_mib,
            network_mode: constants::TASK_NETWORK_MODE.to_string(),
            compatibility: constants::TASK_COMPATIBILITY.to_string(),
        },
        &[CLUSTER_NODE],
    )?;
    graph.add(
        container.as_str(),
        Resource::ContainerSpec {
            task: task.clone(),
            image: desc.image.clone(),
            tag: desc.image_tag.clone(),
            memory_limit_mib: desc.memory_mib,
            port_mappings: vec![PortMapping {
                container_port: desc.container_port,
                protocol: "tcp".into(),
            }],
        },
        &[task.as_str()],
    )?;
    graph.add(
        desc.service_id(),
        Resource::ServiceInstance {
            service_name: desc.name.clone(),
            cluster: CLUSTER_NODE.to_string(),
            task: task.clone(),
            container_port: desc.container_port,
        },
        &[CLUSTER_NODE, task.as_str(), container.as_str()],
    )
}

fn check_cluster_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_CLUSTER_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(PlanError::Config {
            message: format!(
                "cluster name \"{name}\" must be 1 to {MAX_CLUSTER_NAME_LEN} alphanumerics, hyphens, or underscores"
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use stackplan_common::types::{Handle, ResourceKind};

    use super::*;
    use crate::graph::NodeKind;

    fn svc(name: &str, port: u16) -> ServiceDescriptor {
        let image = Handle::external(
            ResourceKind::ImageRegistry,
            format!("arn:aws:ecr:us-east-1:123456789012:repository/{name}-app"),
        );
        ServiceDescriptor::new(name, image, port)
    }

    #[test]
    fn empty_service_list_builds_roots_only() {
        let graph = build(&NetworkConfig::default(), "Services", &[]).expect("build");
        let ids: Vec<&str> = graph.nodes().map(|n| n.id()).collect();
        assert_eq!(ids, vec!["network", "cluster"]);
    }

    #[test]
    fn each_service_gets_task_container_and_instance() {
        let graph = build(
            &NetworkConfig::default(),
            "Services",
            &[svc("nav", 9002).route("/nav.js"), svc("main", 9000)],
        )
        .expect("build");

        let ids: Vec<&str> = graph.nodes().map(|n| n.id()).collect();
        assert_eq!(
            ids,
            vec![
                "network",
                "cluster",
                "nav-task",
                "nav-container",
                "nav-service",
                "main-task",
                "main-container",
                "main-service",
            ]
        );
        assert_eq!(graph.nodes_of_kind(NodeKind::ServiceInstance).count(), 2);
    }

    #[test]
    fn service_depends_on_cluster_task_and_container() {
        let graph = build(&NetworkConfig::default(), "Services", &[svc("home", 9001)])
            .expect("build");
        let service = graph.node("home-service").expect("service node");
        assert_eq!(
            service.depends_on(),
            ["cluster", "home-task", "home-container"]
        );
        let task = graph.node("home-task").expect("task node");
        assert_eq!(task.depends_on(), ["cluster"]);
    }

    #[test]
    fn ports_and_sizing_follow_descriptor() {
        let graph = build(
            &NetworkConfig::default(),
            "Services",
            &[svc("details", 9003).sizing(512, 1024)],
        )
        .expect("build");

        match graph.node("details-task").map(|n| n.resource()) {
            Some(Resource::TaskSpec {
                cpu_units,
                memory_mib,
                network_mode,
                ..
            }) => {
                assert_eq!((*cpu_units, *memory_mib), (512, 1024));
                assert_eq!(network_mode, "awsvpc");
            }
            other => panic!("unexpected task node: {other:?}"),
        }
        match graph.node("details-container").map(|n| n.resource()) {
            Some(Resource::ContainerSpec {
                port_mappings,
                memory_limit_mib,
                tag,
                ..
            }) => {
                assert_eq!(port_mappings[0].container_port, 9003);
                assert_eq!(*memory_limit_mib, 1024);
                assert_eq!(tag, "latest");
            }
            other => panic!("unexpected container node: {other:?}"),
        }
    }

    #[test]
    fn invalid_descriptor_creates_no_graph() {
        let err = build(&NetworkConfig::default(), "Services", &[svc("main", 0)]).unwrap_err();
        assert!(matches!(err, PlanError::InvalidTopology { .. }), "got: {err}");
    }

    #[test]
    fn invalid_cluster_name_is_rejected() {
        let err = build(&NetworkConfig::default(), "my cluster", &[]).unwrap_err();
        assert!(err.to_string().contains("cluster name"), "got: {err}");
    }

    #[test]
    fn invalid_network_is_rejected() {
        let network = NetworkConfig {
            cidr: "not-a-cidr".into(),
            max_azs: 2,
        };
        assert!(build(&network, "Services", &[]).is_err());
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let services = vec![svc("nav", 9002).route("/nav.js"), svc("main", 9000)];
        let a = build(&NetworkConfig::default(), "Services", &services).expect("build");
        let b = build(&NetworkConfig::default(), "Services", &services).expect("build");
        assert_eq!(a, b);
        assert_eq!(
            a.fingerprint().expect("fingerprint"),
            b.fingerprint().expect("fingerprint")
        );
    }

    #[test]
    fn graph_is_acyclic() {
        let graph = build(
            &NetworkConfig::default(),
            "Services",
            &[svc("a", 80).route("/a"), svc("b", 81).route("/b")],
        )
        .expect("build");
        let order = graph.deployment_order().expect("acyclic");
        assert_eq!(order.len(), graph.len());
        assert_eq!(order[0], "network");
    }
}
