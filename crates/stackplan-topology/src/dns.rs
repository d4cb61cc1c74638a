//! Alias record binding.

use serde::Serialize;

use stackplan_common::error::{PlanError, Result};
use stackplan_common::types::{Handle, ResourceKind};

use crate::graph::{GraphBuilder, Resource, ResourceGraph};
use crate::resolver::is_dns_label;

const ALIAS_RECORD_TYPE: &str = "A";

/// Declarative description of an alias record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsRecordSpec {
    /// Hosted zone the record lives in.
    pub zone: Handle,
    /// Record name relative to the zone.
    pub record_name: String,
    /// Fully qualified record name.
    pub fqdn: String,
    /// Alias target.
    pub target: Handle,
    /// TTL in seconds.
    pub ttl_seconds: u32,
    /// Free-form comment.
    pub comment: Option<String>,
}

impl DnsRecordSpec {
    /// Attaches a comment to the record.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Id of the record's graph node.
    #[must_use]
    pub fn node_id(&self) -> String {
        format!("{}-dns", self.record_name)
    }
}

/// Builds an alias record named `record_name` in `zone` pointing at `target`.
///
/// # Errors
///
/// Returns [`PlanError::InvalidTtl`] if `ttl_seconds` is not positive,
/// [`PlanError::Resolution`] if a handle has the wrong kind, and
/// [`PlanError::Config`] if the record name is not a valid DNS name.
pub fn bind(
    zone: &Handle,
    record_name: &str,
    target: &Handle,
    ttl_seconds: i64,
) -> Result<DnsRecordSpec> {
    let ttl = u32::try_from(ttl_seconds)
        .ok()
        .filter(|&t| t > 0 && i32::try_from(t).is_ok())
        .ok_or(PlanError::InvalidTtl { ttl_seconds })?;
    let _ = zone.expect_kind(ResourceKind::DnsZone)?;
    let _ = target.expect_kind(ResourceKind::LoadBalancer)?;
    if record_name.is_empty() || !record_name.split('.').all(is_dns_label) {
        return Err(PlanError::Config {
            message: format!("record name \"{record_name}\" is not a valid DNS name"),
        });
    }

    let fqdn = format!("{record_name}.{}", zone.as_str());
    tracing::debug!(%fqdn, target = %target, ttl, "binding alias record");
    Ok(DnsRecordSpec {
        zone: zone.clone(),
        record_name: record_name.to_string(),
        fqdn,
        target: target.clone(),
        ttl_seconds: ttl,
        comment: None,
    })
}

/// Returns `graph` extended with a node for `record`.
///
/// A record aliasing a planned load balancer depends on its node; one
/// aliasing an external load balancer has no dependencies.
///
/// # Errors
///
/// Returns [`PlanError::Config`] if the planned target is not in `graph`
/// or the record is already present.
pub fn attach(graph: &ResourceGraph, record: &DnsRecordSpec) -> Result<ResourceGraph> {
    let mut builder = GraphBuilder::extend(graph);
    let deps: Vec<&str> = record.target.planned_node().into_iter().collect();
    if let Some(missing) = deps.iter().find(|d| !builder.contains(d)) {
        return Err(PlanError::Config {
            message: format!("alias target \"{missing}\" is not part of the plan"),
        });
    }
    builder.add(
        record.node_id(),
        Resource::DnsRecord {
            zone: record.zone.clone(),
            fqdn: record.fqdn.clone(),
            record_type: ALIAS_RECORD_TYPE.to_string(),
            target: record.target.clone(),
            ttl_seconds: record.ttl_seconds,
            comment: record.comment.clone(),
        },
        &deps,
    )?;
    Ok(builder.finish())
}
