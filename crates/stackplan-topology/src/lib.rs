//! # stackplan-topology
//!
//! Plans a multi-service container topology behind one shared load balancer.
//!
//! Handles:
//! - **Resolver**: Turning external identifiers into opaque handles.
//! - **Descriptor**: The per-service unit of configuration.
//! - **Validator**: Full invariant pass over all descriptors.
//! - **Builder**: Network, cluster, and per-service task/container/service nodes.
//! - **Routing**: Target groups, path rules, priorities, and the default action.
//! - **DNS**: The alias record pointing at the load balancer.
//! - **Manifest** and **Plan**: YAML input and the end-to-end pipeline.
//!
//! Everything here is a pure planning pass: nothing talks to a live system.

pub mod builder;
pub mod descriptor;
pub mod dns;
pub mod graph;
pub mod manifest;
pub mod plan;
pub mod resolver;
pub mod routing;
pub mod validator;

pub use builder::build;
pub use descriptor::ServiceDescriptor;
pub use dns::{DnsRecordSpec, bind};
pub use graph::{NodeKind, Resource, ResourceGraph, ResourceNode};
pub use manifest::Manifest;
pub use plan::DeploymentPlan;
pub use resolver::resolve;
pub use routing::{Listener, ListenerState, RoutingAssignment, assign};
