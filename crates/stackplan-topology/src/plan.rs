//! End-to-end planning: manifest in, immutable deployment plan out.

use stackplan_common::error::Result;
use stackplan_common::types::ResourceKind;

use crate::dns::{self, DnsRecordSpec};
use crate::graph::ResourceGraph;
use crate::manifest::Manifest;
use crate::routing::{self, Listener};
use crate::{builder, resolver};

/// A complete, validated deployment plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    graph: ResourceGraph,
    listener: Listener,
    dns_record: Option<DnsRecordSpec>,
}

impl DeploymentPlan {
    /// Compiles `manifest` into a plan.
    ///
    /// Resolves references, builds the topology, assigns routes, and binds
    /// the alias record. Any failure aborts the whole pass.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any stage.
    pub fn compile(manifest: &Manifest) -> Result<Self> {
        tracing::info!(
            cluster = %manifest.cluster.name,
            services = manifest.services.len(),
            "compiling deployment plan"
        );
        let zone = manifest
            .dns
            .as_ref()
            .map(|dns| resolver::resolve(ResourceKind::DnsZone, &dns.zone))
            .transpose()?;
        let descriptors = manifest.descriptors()?;

        let graph = builder::build(&manifest.network, &manifest.cluster.name, &descriptors)?;
        let routing = routing::assign(&graph, &manifest.load_balancer, &descriptors)?;

        let (graph, dns_record) = match (&manifest.dns, zone) {
            (Some(dns_config), Some(zone)) => {
                let mut record = dns::bind(
                    &zone,
                    &dns_config.record_name,
                    &routing.alias_target,
                    dns_config.ttl_seconds,
                )?;
                if let Some(comment) = &dns_config.comment {
                    record = record.with_comment(comment.clone());
                }
                (dns::attach(&routing.graph, &record)?, Some(record))
            }
            _ => (routing.graph, None),
        };

        tracing::info!(nodes = graph.len(), "deployment plan compiled");
        Ok(Self {
            graph,
            listener: routing.listener,
            dns_record,
        })
    }

    /// Returns the resource graph.
    #[must_use]
    pub const fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    /// Returns the configured listener.
    #[must_use]
    pub const fn listener(&self) -> &Listener {
        &self.listener
    }

    /// Returns the alias record, if the manifest asked for one.
    #[must_use]
    pub const fn dns_record(&self) -> Option<&DnsRecordSpec> {
        self.dns_record.as_ref()
    }

    /// Returns node ids in an order that satisfies every dependency.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph contains cycles.
    pub fn deployment_order(&self) -> Result<Vec<&str>> {
        self.graph.deployment_order()
    }

    /// Consumes the plan and returns its graph.
    #[must_use]
    pub fn into_graph(self) -> ResourceGraph {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use stackplan_common::error::PlanError;

    use super::*;
    use crate::graph::NodeKind;

    const MANIFEST: &str = r"
dns:
  zone: example.com
  record_name: services
  ttl_seconds: 120
services:
  - name: nav
    image: arn:aws:ecr:us-east-1:123456789012:repository/navigation-app
    container_port: 9002
    route_path: /nav.js
  - name: main
    image: arn:aws:ecr:us-east-1:123456789012:repository/container-app
    container_port: 9000
";

    fn compile(input: &str) -> Result<DeploymentPlan> {
        DeploymentPlan::compile(&Manifest::from_yaml_str(input)?)
    }

    #[test]
    fn compiles_every_stage() {
        let plan = compile(MANIFEST).expect("compile");
        let graph = plan.graph();
        assert_eq!(graph.nodes_of_kind(NodeKind::TargetGroup).count(), 2);
        assert_eq!(graph.nodes_of_kind(NodeKind::RoutingRule).count(), 1);
        assert_eq!(graph.nodes_of_kind(NodeKind::DnsRecord).count(), 1);

        let record = plan.dns_record().expect("dns record");
        assert_eq!(record.fqdn, "services.example.com");
        assert_eq!(record.ttl_seconds, 120);

        let order = plan.deployment_order().expect("order");
        assert_eq!(order.len(), graph.len());
        let pos = |id: &str| order.iter().position(|n| *n == id).expect(id);
        assert!(pos("load-balancer") < pos("services-dns"));
        assert!(pos("main-tg") < pos("listener"));
    }

    #[test]
    fn dns_is_optional() {
        let input = MANIFEST.replace(
            "dns:\n  zone: example.com\n  record_name: services\n  ttl_seconds: 120\n",
            "",
        );
        let plan = compile(&input).expect("compile");
        assert!(plan.dns_record().is_none());
        assert_eq!(plan.graph().nodes_of_kind(NodeKind::DnsRecord).count(), 0);
    }

    #[test]
    fn bad_zone_fails_the_whole_plan() {
        let input = MANIFEST.replace("zone: example.com", "zone: localhost");
        let err = compile(&input).unwrap_err();
        assert!(matches!(err, PlanError::Resolution { .. }), "got: {err}");
    }

    #[test]
    fn bad_ttl_fails_the_whole_plan() {
        let input = MANIFEST.replace("ttl_seconds: 120", "ttl_seconds: -1");
        let err = compile(&input).unwrap_err();
        assert!(matches!(err, PlanError::InvalidTtl { ttl_seconds: -1 }), "got: {err}");
    }

    #[test]
    fn compiling_twice_yields_identical_plans() {
        let a = compile(MANIFEST).expect("compile");
        let b = compile(MANIFEST).expect("compile");
        assert_eq!(a, b);
        assert_eq!(
            a.graph().to_json().expect("json"),
            b.graph().to_json().expect("json")
        );
    }
}
