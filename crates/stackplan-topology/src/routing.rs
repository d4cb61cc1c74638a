//! Routing assignment on the shared load balancer.
//!
//! Every service gets a target group. Services with a route path get a
//! path-pattern rule with a unique priority; the single service without one
//! becomes the listener's default action. The load balancer evaluates rules
//! in ascending priority and the first match wins, so unique priorities make
//! the evaluation order well defined.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use stackplan_common::config::LoadBalancerConfig;
use stackplan_common::constants;
use stackplan_common::error::{PlanError, Result, Violation};
use stackplan_common::types::{Handle, ResourceKind};

use crate::builder::NETWORK_NODE;
use crate::descriptor::ServiceDescriptor;
use crate::graph::{GraphBuilder, Resource, ResourceGraph};

/// Id of the load balancer node.
pub const LOAD_BALANCER_NODE: &str = "load-balancer";
/// Id of the listener node.
pub const LISTENER_NODE: &str = "listener";

const LISTENER_PROTOCOL: &str = "HTTP";
const TARGET_PROTOCOL: &str = "HTTP";

/// Configuration progress of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListenerState {
    /// No rule or default action attached yet.
    Unconfigured,
    /// Some, but not all, services are attached.
    PartiallyConfigured,
    /// Every service is attached; no further attachments are accepted.
    Configured,
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => write!(f, "unconfigured"),
            Self::PartiallyConfigured => write!(f, "partially-configured"),
            Self::Configured => write!(f, "configured"),
        }
    }
}

/// A path-pattern rule forwarding to one service's target group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingRule {
    /// Service the rule forwards to.
    pub service: String,
    /// Target group node.
    pub target_group: String,
    /// Path pattern condition.
    pub path_pattern: String,
    /// Evaluation priority, lower first.
    pub priority: u32,
}

/// The default action of a listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefaultAction {
    /// Service receiving unmatched requests.
    pub service: String,
    /// Target group node.
    pub target_group: String,
}

/// Where a request path ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome<'a> {
    /// Matched a rule.
    Rule(&'a RoutingRule),
    /// Fell through to the default action.
    Default(&'a DefaultAction),
    /// No rule matched and there is no default action.
    NoMatch,
}

/// The listener's routing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listener {
    id: String,
    port: u16,
    state: ListenerState,
    rules: Vec<RoutingRule>,
    default_action: Option<DefaultAction>,
    #[serde(skip)]
    expected: usize,
    #[serde(skip)]
    attached: usize,
}

impl Listener {
    /// Creates a listener that expects `expected` attachments.
    ///
    /// A listener expecting nothing is configured from the start.
    #[must_use]
    pub fn new(id: impl Into<String>, port: u16, expected: usize) -> Self {
        Self {
            id: id.into(),
            port,
            state: if expected == 0 {
                ListenerState::Configured
            } else {
                ListenerState::Unconfigured
            },
            rules: Vec::new(),
            default_action: None,
            expected,
            attached: 0,
        }
    }

    /// Returns the listener node id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the port traffic is accepted on.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the configuration state.
    #[must_use]
    pub const fn state(&self) -> ListenerState {
        self.state
    }

    /// Returns the rules in ascending priority.
    #[must_use]
    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }

    /// Returns the default action, if any.
    #[must_use]
    pub const fn default_action(&self) -> Option<&DefaultAction> {
        self.default_action.as_ref()
    }

    /// Attaches a path-pattern rule.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::ListenerSealed`] once the listener is configured
    /// and [`PlanError::DuplicatePriority`] if the priority is taken.
    pub fn attach_rule(&mut self, rule: RoutingRule) -> Result<()> {
        self.ensure_open()?;
        if let Some(existing) = self.rules.iter().find(|r| r.priority == rule.priority) {
            return Err(PlanError::DuplicatePriority {
                priority: rule.priority,
                services: vec![existing.service.clone(), rule.service],
            });
        }
        let at = self.rules.partition_point(|r| r.priority < rule.priority);
        self.rules.insert(at, rule);
        self.record_attachment();
        Ok(())
    }

    /// Sets the default action.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::ListenerSealed`] once the listener is configured
    /// and [`PlanError::AmbiguousDefaultRoute`] if a default is already set.
    pub fn set_default_action(&mut self, action: DefaultAction) -> Result<()> {
        self.ensure_open()?;
        if let Some(existing) = &self.default_action {
            return Err(PlanError::AmbiguousDefaultRoute {
                services: vec![existing.service.clone(), action.service],
            });
        }
        self.default_action = Some(action);
        self.record_attachment();
        Ok(())
    }

    /// Resolves a request path the way the load balancer would: rules in
    /// ascending priority, first match wins, then the default action.
    #[must_use]
    pub fn route(&self, path: &str) -> RouteOutcome<'_> {
        if let Some(rule) = self
            .rules
            .iter()
            .find(|r| path_matches(&r.path_pattern, path))
        {
            return RouteOutcome::Rule(rule);
        }
        self.default_action
            .as_ref()
            .map_or(RouteOutcome::NoMatch, RouteOutcome::Default)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == ListenerState::Configured {
            Err(PlanError::ListenerSealed {
                listener: self.id.clone(),
            })
        } else {
            Ok(())
        }
    }

    fn record_attachment(&mut self) {
        self.attached += 1;
        self.state = if self.attached >= self.expected {
            ListenerState::Configured
        } else {
            ListenerState::PartiallyConfigured
        };
        tracing::debug!(listener = %self.id, state = %self.state, "listener attachment");
    }
}

/// Matches a path against a load balancer path pattern.
///
/// Patterns are case sensitive; `*` matches any run of characters and `?`
/// matches exactly one.
#[must_use]
pub fn path_matches(pattern: &str, path: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let path: Vec<char> = path.chars().collect();
    let (mut p, mut s) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while s < path.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, s));
                p += 1;
            }
            Some(&c) if c == '?' || c == path[s] => {
                p += 1;
                s += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    s = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

/// A routed service and the priority it ended up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignedPriority<'a> {
    /// The routed service.
    pub descriptor: &'a ServiceDescriptor,
    /// Its rule priority.
    pub priority: u32,
}

/// Gives every routed descriptor a priority.
///
/// Explicit priorities are kept. The others are numbered from 1 in
/// descriptor order, skipping every value some descriptor claimed
/// explicitly. Descriptors without a route path are ignored.
///
/// # Errors
///
/// Returns [`PlanError::DuplicatePriority`] if two descriptors share a
/// priority, and [`PlanError::InvalidTopology`] if the priority range runs out.
pub fn assign_priorities(descriptors: &[ServiceDescriptor]) -> Result<Vec<AssignedPriority<'_>>> {
    let routed = descriptors.iter().filter(|d| !d.is_default_route());
    let claimed: BTreeSet<u32> = routed.clone().filter_map(|d| d.priority).collect();

    let mut next = constants::MIN_RULE_PRIORITY;
    let mut assigned = Vec::new();
    for desc in routed {
        let priority = if let Some(explicit) = desc.priority {
            explicit
        } else {
            while claimed.contains(&next) {
                next += 1;
            }
            if next > constants::MAX_RULE_PRIORITY {
                return Err(PlanError::InvalidTopology {
                    violations: vec![Violation::new(
                        &desc.name,
                        "no routing priority left to assign",
                    )],
                });
            }
            next += 1;
            next - 1
        };
        assigned.push(AssignedPriority {
            descriptor: desc,
            priority,
        });
    }

    let mut by_priority: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for a in &assigned {
        by_priority
            .entry(a.priority)
            .or_default()
            .push(a.descriptor.name.clone());
    }
    if let Some((&priority, services)) = by_priority.iter().find(|(_, s)| s.len() > 1) {
        return Err(PlanError::DuplicatePriority {
            priority,
            services: services.clone(),
        });
    }
    Ok(assigned)
}

/// Result of routing assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingAssignment {
    /// The input graph extended with load balancer, listener, target group,
    /// and rule nodes.
    pub graph: ResourceGraph,
    /// The configured listener.
    pub listener: Listener,
    /// Handle of the planned load balancer, usable as a DNS alias target.
    pub alias_target: Handle,
}

/// Attaches routing for `descriptors` to a new load balancer listener.
///
/// `graph` must already hold the service instances, i.e. come from
/// [`build`](crate::builder::build) over the same descriptors. Nothing is
/// returned unless every service is attached.
///
/// # Errors
///
/// Returns [`PlanError::AmbiguousDefaultRoute`] if more than one service has
/// no route path, [`PlanError::DuplicatePriority`] if priorities collide,
/// and [`PlanError::Config`] if the load balancer config is invalid or a
/// service instance is missing from `graph`.
pub fn assign(
    graph: &ResourceGraph,
    lb: &LoadBalancerConfig,
    descriptors: &[ServiceDescriptor],
) -> Result<RoutingAssignment> {
    tracing::info!(
        load_balancer = %lb.name,
        services = descriptors.len(),
        "assigning routes"
    );
    lb.validate()?;

    let defaulted: Vec<&ServiceDescriptor> =
        descriptors.iter().filter(|d| d.is_default_route()).collect();
    if defaulted.len() > 1 {
        return Err(PlanError::AmbiguousDefaultRoute {
            services: defaulted.iter().map(|d| d.name.clone()).collect(),
        });
    }
    let priorities = assign_priorities(descriptors)?;

    if let Some(missing) = descriptors.iter().find(|d| !graph.contains(&d.service_id())) {
        return Err(PlanError::Config {
            message: format!(
                "service \"{}\" has no planned service instance; build the topology first",
                missing.name
            ),
        });
    }

    let mut builder = GraphBuilder::extend(graph);
    builder.add(
        LOAD_BALANCER_NODE,
        Resource::LoadBalancer {
            name: lb.name.clone(),
            internet_facing: lb.internet_facing,
        },
        &[NETWORK_NODE],
    )?;

    for desc in descriptors {
        let service = desc.service_id();
        builder.add(
            desc.target_group_id(),
            Resource::TargetGroup {
                name: desc.target_group_id(),
                protocol: TARGET_PROTOCOL.to_string(),
                port: desc.container_port,
                target: service.clone(),
            },
            &[LOAD_BALANCER_NODE, service.as_str()],
        )?;
    }

    let mut listener = Listener::new(LISTENER_NODE, lb.listener_port, descriptors.len());
    let mut ordered = priorities;
    ordered.sort_by_key(|a| a.priority);
    for a in &ordered {
        listener.attach_rule(RoutingRule {
            service: a.descriptor.name.clone(),
            target_group: a.descriptor.target_group_id(),
            path_pattern: a.descriptor.route_path.clone().unwrap_or_default(),
            priority: a.priority,
        })?;
    }
    if let Some(desc) = defaulted.first() {
        listener.set_default_action(DefaultAction {
            service: desc.name.clone(),
            target_group: desc.target_group_id(),
        })?;
    }

    let default_target_group = listener.default_action().map(|a| a.target_group.clone());
    let mut listener_deps = vec![LOAD_BALANCER_NODE];
    if let Some(tg) = &default_target_group {
        listener_deps.push(tg.as_str());
    }
    builder.add(
        LISTENER_NODE,
        Resource::Listener {
            port: lb.listener_port,
            protocol: LISTENER_PROTOCOL.to_string(),
            open: lb.open,
            default_target_group: default_target_group.clone(),
        },
        &listener_deps,
    )?;

    for (rule, a) in listener.rules().iter().zip(&ordered) {
        builder.add(
            a.descriptor.rule_id(),
            Resource::RoutingRule {
                listener: LISTENER_NODE.to_string(),
                priority: rule.priority,
                path_pattern: rule.path_pattern.clone(),
                target_group: rule.target_group.clone(),
            },
            &[LISTENER_NODE, rule.target_group.as_str()],
        )?;
    }

    tracing::info!(
        rules = listener.rules().len(),
        default = listener.default_action().map(|a| a.service.as_str()),
        state = %listener.state(),
        "routes assigned"
    );
    Ok(RoutingAssignment {
        graph: builder.finish(),
        listener,
        alias_target: Handle::planned(ResourceKind::LoadBalancer, LOAD_BALANCER_NODE),
    })
}
