//! Domain primitive types used across the stackplan workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of an externally identified resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// A container image repository.
    ImageRegistry,
    /// A hosted DNS zone.
    DnsZone,
    /// A load balancer usable as an alias target.
    LoadBalancer,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageRegistry => write!(f, "image-registry"),
            Self::DnsZone => write!(f, "dns-zone"),
            Self::LoadBalancer => write!(f, "load-balancer"),
        }
    }
}

/// Where the resource behind a [`Handle`] comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "origin", rename_all = "kebab-case")]
enum Origin {
    /// Exists outside the plan and was referenced by identifier.
    External,
    /// Created by the plan itself as the graph node with this id.
    Planned { node: String },
}

/// Opaque reference to a resource the planner does not own.
///
/// Handles are passed along unchanged; the planner only ever compares
/// their kind. External handles come from the reference resolver, planned
/// handles are minted for nodes of the graph being built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Handle {
    kind: ResourceKind,
    id: String,
    #[serde(flatten)]
    origin: Origin,
}

impl Handle {
    /// Creates a handle for an externally managed resource.
    ///
    /// The identifier is not validated here; use the reference resolver.
    #[must_use]
    pub fn external(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            origin: Origin::External,
        }
    }

    /// Creates a handle for a resource planned as the graph node `node`.
    #[must_use]
    pub fn planned(kind: ResourceKind, node: impl Into<String>) -> Self {
        let node = node.into();
        Self {
            kind,
            id: node.clone(),
            origin: Origin::Planned { node },
        }
    }

    /// Returns the kind of resource this handle refers to.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Returns the graph node backing this handle, if the plan creates it.
    #[must_use]
    pub fn planned_node(&self) -> Option<&str> {
        match &self.origin {
            Origin::External => None,
            Origin::Planned { node } => Some(node),
        }
    }

    /// Returns the identifier the handle was created from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// Checks that the handle refers to a resource of `expected` kind.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Resolution`](crate::error::PlanError::Resolution)
    /// if the kinds differ.
    pub fn expect_kind(&self, expected: ResourceKind) -> crate::error::Result<&Self> {
        if self.kind == expected {
            Ok(self)
        } else {
            Err(crate::error::PlanError::Resolution {
                kind: expected,
                identifier: self.id.clone(),
                reason: format!("handle refers to a {} resource", self.kind),
            })
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Origin::External => write!(f, "{}:{}", self.kind, self.id),
            Origin::Planned { node } => write!(f, "{}:planned/{node}", self.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_handle_has_no_planned_node() {
        let handle = Handle::external(ResourceKind::DnsZone, "example.com");
        assert_eq!(handle.kind(), ResourceKind::DnsZone);
        assert_eq!(handle.planned_node(), None);
        assert_eq!(handle.to_string(), "dns-zone:example.com");
    }

    #[test]
    fn planned_handle_points_at_node() {
        let handle = Handle::planned(ResourceKind::LoadBalancer, "load-balancer");
        assert_eq!(handle.planned_node(), Some("load-balancer"));
        assert_eq!(handle.to_string(), "load-balancer:planned/load-balancer");
    }

    #[test]
    fn expect_kind_rejects_mismatch() {
        let handle = Handle::external(ResourceKind::DnsZone, "example.com");
        assert!(handle.expect_kind(ResourceKind::DnsZone).is_ok());
        let err = handle
            .expect_kind(ResourceKind::LoadBalancer)
            .expect_err("kind mismatch");
        assert!(err.to_string().contains("dns-zone"), "got: {err}");
    }

    #[test]
    fn handle_serializes_kind_and_origin() {
        let handle = Handle::planned(ResourceKind::LoadBalancer, "load-balancer");
        let json = serde_json::to_value(&handle).expect("serialize");
        assert_eq!(json["kind"], "load-balancer");
        assert_eq!(json["origin"], "planned");
        assert_eq!(json["node"], "load-balancer");
    }
}
