//! The per-service unit of configuration.

use serde::Serialize;

use stackplan_common::constants;
use stackplan_common::types::Handle;

/// Declarative description of one deployable service.
///
/// All graph node ids belonging to the service derive from `name`, so
/// planning the same descriptors twice yields the same graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDescriptor {
    /// Unique service name.
    pub name: String,
    /// Image repository handle.
    pub image: Handle,
    /// Image tag within the repository.
    pub image_tag: String,
    /// Port the container listens on inside its task.
    pub container_port: u16,
    /// Task CPU units.
    pub cpu_units: u32,
    /// Task memory in MiB.
    pub memory_mib: u32,
    /// Path pattern routed to this service; `None` makes it the default route.
    pub route_path: Option<String>,
    /// Explicit rule priority; assigned from descriptor order when unset.
    pub priority: Option<u32>,
}

impl ServiceDescriptor {
    /// Creates a default-routed descriptor with stock sizing.
    #[must_use]
    pub fn new(name: impl Into<String>, image: Handle, container_port: u16) -> Self {
        Self {
            name: name.into(),
            image,
            image_tag: constants::DEFAULT_IMAGE_TAG.to_string(),
            container_port,
            cpu_units: constants::DEFAULT_CPU_UNITS,
            memory_mib: constants::DEFAULT_MEMORY_MIB,
            route_path: None,
            priority: None,
        }
    }

    /// Routes requests matching `path` to this service.
    #[must_use]
    pub fn route(mut self, path: impl Into<String>) -> Self {
        self.route_path = Some(path.into());
        self
    }

    /// Pins the rule priority.
    #[must_use]
    pub const fn priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets task sizing.
    #[must_use]
    pub const fn sizing(mut self, cpu_units: u32, memory_mib: u32) -> Self {
        self.cpu_units = cpu_units;
        self.memory_mib = memory_mib;
        self
    }

    /// Sets the image tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.image_tag = tag.into();
        self
    }

    /// Returns true if this service receives unmatched requests.
    #[must_use]
    pub const fn is_default_route(&self) -> bool {
        self.route_path.is_none()
    }

    /// Id of the service's task definition node.
    #[must_use]
    pub fn task_id(&self) -> String {
        format!("{}-task", self.name)
    }

    /// Id of the service's container node.
    #[must_use]
    pub fn container_id(&self) -> String {
        format!("{}-container", self.name)
    }

    /// Id of the service instance node.
    #[must_use]
    pub fn service_id(&self) -> String {
        format!("{}-service", self.name)
    }

    /// Id (and name) of the service's target group.
    #[must_use]
    pub fn target_group_id(&self) -> String {
        format!("{}{}", self.name, constants::TARGET_GROUP_SUFFIX)
    }

    /// Id of the service's routing rule node.
    #[must_use]
    pub fn rule_id(&self) -> String {
        format!("{}-rule", self.name)
    }
}

#[cfg(test)]
mod tests {
    use stackplan_common::types::ResourceKind;

    use super::*;

    fn image() -> Handle {
        Handle::external(
            ResourceKind::ImageRegistry,
            "arn:aws:ecr:us-east-1:123456789012:repository/nav-app",
        )
    }

    #[test]
    fn new_descriptor_is_default_routed_with_stock_sizing() {
        let desc = ServiceDescriptor::new("main", image(), 9000);
        assert!(desc.is_default_route());
        assert_eq!(desc.cpu_units, 256);
        assert_eq!(desc.memory_mib, 512);
        assert_eq!(desc.image_tag, "latest");
        assert_eq!(desc.priority, None);
    }

    #[test]
    fn builder_methods_set_routing() {
        let desc = ServiceDescriptor::new("nav", image(), 9002)
            .route("/nav.js")
            .priority(4)
            .sizing(512, 1024)
            .tag("v2");
        assert!(!desc.is_default_route());
        assert_eq!(desc.route_path.as_deref(), Some("/nav.js"));
        assert_eq!(desc.priority, Some(4));
        assert_eq!((desc.cpu_units, desc.memory_mib), (512, 1024));
        assert_eq!(desc.image_tag, "v2");
    }

    #[test]
    fn node_ids_derive_from_name() {
        let desc = ServiceDescriptor::new("home", image(), 9001);
        assert_eq!(desc.task_id(), "home-task");
        assert_eq!(desc.container_id(), "home-container");
        assert_eq!(desc.service_id(), "home-service");
        assert_eq!(desc.target_group_id(), "home-tg");
        assert_eq!(desc.rule_id(), "home-rule");
    }
}
