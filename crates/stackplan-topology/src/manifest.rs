//! YAML manifest describing a deployment.
//!
//! ```yaml
//! cluster:
//!   name: Services
//! dns:
//!   zone: example.com
//!   record_name: services
//! services:
//!   - name: nav
//!     image: arn:aws:ecr:us-east-1:123456789012:repository/navigation-app
//!     container_port: 9002
//!     route_path: /nav.js
//!   - name: main
//!     image: arn:aws:ecr:us-east-1:123456789012:repository/container-app
//!     container_port: 9000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use stackplan_common::config::{
    ClusterConfig, DnsConfig, LoadBalancerConfig, NetworkConfig, ServiceDefaults,
};
use stackplan_common::error::{PlanError, Result};
use stackplan_common::types::ResourceKind;

use crate::descriptor::ServiceDescriptor;
use crate::resolver;

/// One service entry of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSpec {
    /// Unique service name.
    pub name: String,
    /// Image repository identifier.
    pub image: String,
    /// Image tag; falls back to the manifest default.
    #[serde(default)]
    pub tag: Option<String>,
    /// Port the container listens on.
    pub container_port: u16,
    /// Task CPU units; falls back to the manifest default.
    #[serde(default)]
    pub cpu_units: Option<u32>,
    /// Task memory in MiB; falls back to the manifest default.
    #[serde(default)]
    pub memory_mib: Option<u32>,
    /// Path pattern routed to the service.
    #[serde(default)]
    pub route_path: Option<String>,
    /// Explicit rule priority.
    #[serde(default)]
    pub priority: Option<u32>,
}

/// A complete deployment manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Virtual network.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Orchestration cluster.
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Shared load balancer.
    #[serde(default)]
    pub load_balancer: LoadBalancerConfig,
    /// Alias record; omitted when the plan needs no DNS entry.
    #[serde(default)]
    pub dns: Option<DnsConfig>,
    /// Per-service fallbacks.
    #[serde(default)]
    pub defaults: ServiceDefaults,
    /// Services in routing order.
    #[serde(default)]
    pub services: Vec<ServiceSpec>,
}

impl Manifest {
    /// Parses a manifest from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Manifest`] if the document is malformed.
    pub fn from_yaml_str(input: &str) -> Result<Self> {
        tracing::info!("parsing manifest");
        Ok(serde_yaml::from_str(input)?)
    }

    /// Reads and parses a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Io`] if the file cannot be read and
    /// [`PlanError::Manifest`] if it is malformed.
    pub fn from_path(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "loading manifest");
        let content = std::fs::read_to_string(path).map_err(|e| PlanError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Resolves every service entry into a descriptor, in manifest order.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Resolution`] for the first image identifier that
    /// cannot be resolved.
    pub fn descriptors(&self) -> Result<Vec<ServiceDescriptor>> {
        self.services
            .iter()
            .map(|spec| {
                let image = resolver::resolve(ResourceKind::ImageRegistry, &spec.image)?;
                Ok(ServiceDescriptor {
                    name: spec.name.clone(),
                    image,
                    image_tag: spec
                        .tag
                        .clone()
                        .unwrap_or_else(|| self.defaults.image_tag.clone()),
                    container_port: spec.container_port,
                    cpu_units: spec.cpu_units.unwrap_or(self.defaults.cpu_units),
                    memory_mib: spec.memory_mib.unwrap_or(self.defaults.memory_mib),
                    route_path: spec.route_path.clone(),
                    priority: spec.priority,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r"
network:
  cidr: 10.1.0.0/16
  max_azs: 3
cluster:
  name: Services
load_balancer:
  name: ServicesLB
dns:
  zone: example.com
  record_name: services
  comment: services subdomain
defaults:
  memory_mib: 1024
services:
  - name: nav
    image: arn:aws:ecr:us-east-1:123456789012:repository/navigation-app
    container_port: 9002
    route_path: /nav.js
  - name: main
    image: arn:aws:ecr:us-east-1:123456789012:repository/container-app
    tag: v3
    container_port: 9000
    cpu_units: 512
";

    #[test]
    fn parses_full_manifest() {
        let manifest = Manifest::from_yaml_str(SAMPLE).expect("parse");
        assert_eq!(manifest.network.cidr, "10.1.0.0/16");
        assert_eq!(manifest.network.max_azs, 3);
        assert_eq!(manifest.load_balancer.listener_port, 80);
        let dns = manifest.dns.as_ref().expect("dns section");
        assert_eq!(dns.ttl_seconds, 300);
        assert_eq!(manifest.services.len(), 2);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let manifest = Manifest::from_yaml_str("{}").expect("parse");
        assert_eq!(manifest, Manifest::default());
        assert_eq!(manifest.cluster.name, "Services");
        assert!(manifest.dns.is_none());
    }

    #[test]
    fn descriptors_apply_defaults() {
        let manifest = Manifest::from_yaml_str(SAMPLE).expect("parse");
        let descriptors = manifest.descriptors().expect("descriptors");

        let nav = &descriptors[0];
        assert_eq!(nav.route_path.as_deref(), Some("/nav.js"));
        assert_eq!((nav.cpu_units, nav.memory_mib), (256, 1024));
        assert_eq!(nav.image_tag, "latest");

        let main = &descriptors[1];
        assert!(main.is_default_route());
        assert_eq!((main.cpu_units, main.memory_mib), (512, 1024));
        assert_eq!(main.image_tag, "v3");
    }

    #[test]
    fn unknown_field_is_rejected() {
        let input = "services:\n  - name: a\n    image: x\n    container_port: 1\n    replicas: 2\n";
        let err = Manifest::from_yaml_str(input).unwrap_err();
        assert!(matches!(err, PlanError::Manifest { .. }), "got: {err}");
        assert!(err.to_string().contains("replicas"), "got: {err}");
    }

    #[test]
    fn negative_port_is_a_manifest_error() {
        let input = "services:\n  - name: a\n    image: x\n    container_port: -1\n";
        let err = Manifest::from_yaml_str(input).unwrap_err();
        assert!(matches!(err, PlanError::Manifest { .. }), "got: {err}");
    }

    #[test]
    fn unresolvable_image_is_reported() {
        let manifest = Manifest::from_yaml_str(
            "services:\n  - name: a\n    image: \"arn:aws:s3:::bucket\"\n    container_port: 80\n",
        )
        .expect("parse");
        let err = manifest.descriptors().unwrap_err();
        assert!(matches!(err, PlanError::Resolution { .. }), "got: {err}");
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(SAMPLE.as_bytes()).expect("write");
        let manifest = Manifest::from_path(file.path()).expect("load");
        assert_eq!(manifest.services[0].name, "nav");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = Manifest::from_path(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, PlanError::Io { .. }), "got: {err}");
    }
}
