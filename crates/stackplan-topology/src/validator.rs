//! Static validation of service descriptors.
//!
//! Runs every check over every descriptor and reports all violations at
//! once, so a caller can fix a manifest in a single round trip.

use std::collections::HashMap;

use stackplan_common::constants;
use stackplan_common::error::{PlanError, Result, Violation};
use stackplan_common::types::ResourceKind;

use crate::descriptor::ServiceDescriptor;

/// Validates descriptors before any resource is planned.
///
/// # Checks performed
///
/// 1. Names are well formed and short enough for derived resource names.
/// 2. No duplicate names.
/// 3. Container port, CPU units, and memory are positive.
/// 4. The image handle refers to an image repository and the tag is set.
/// 5. Route paths start with `/`, fit the pattern length limit, and are unique.
/// 6. Explicit priorities lie in the accepted range and only accompany a route path.
///
/// The default route and priority collisions are left to the routing
/// assignor, which reports them with their own errors.
///
/// # Errors
///
/// Returns [`PlanError::InvalidTopology`] listing every violation found.
pub fn validate_descriptors(descriptors: &[ServiceDescriptor]) -> Result<()> {
    tracing::info!(services = descriptors.len(), "validating service descriptors");
    let mut violations = Vec::new();

    for desc in descriptors {
        check_name(desc, &mut violations);
        check_sizing(desc, &mut violations);
        check_image(desc, &mut violations);
        check_route(desc, &mut violations);
    }
    check_duplicate_names(descriptors, &mut violations);
    check_duplicate_paths(descriptors, &mut violations);

    if violations.is_empty() {
        Ok(())
    } else {
        for violation in &violations {
            tracing::debug!(%violation, "descriptor rejected");
        }
        Err(PlanError::InvalidTopology { violations })
    }
}

fn check_name(desc: &ServiceDescriptor, out: &mut Vec<Violation>) {
    let name = &desc.name;
    if name.is_empty() {
        out.push(Violation::new(name, "name must not be empty"));
        return;
    }
    if name.len() > constants::MAX_SERVICE_NAME_LEN {
        out.push(Violation::new(
            name,
            format!(
                "name is longer than {} characters",
                constants::MAX_SERVICE_NAME_LEN
            ),
        ));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        || name.starts_with('-')
        || name.ends_with('-')
    {
        out.push(Violation::new(
            name,
            "name may only contain alphanumerics and inner hyphens",
        ));
    }
}

fn check_sizing(desc: &ServiceDescriptor, out: &mut Vec<Violation>) {
    if desc.container_port == 0 {
        out.push(Violation::new(&desc.name, "container port must be positive"));
    }
    if desc.cpu_units == 0 {
        out.push(Violation::new(&desc.name, "cpu units must be positive"));
    }
    if desc.memory_mib == 0 {
        out.push(Violation::new(&desc.name, "memory must be positive"));
    }
}

fn check_image(desc: &ServiceDescriptor, out: &mut Vec<Violation>) {
    if desc.image.kind() != ResourceKind::ImageRegistry {
        out.push(Violation::new(
            &desc.name,
            format!("image handle refers to a {} resource", desc.image.kind()),
        ));
    }
    if desc.image_tag.trim().is_empty() {
        out.push(Violation::new(&desc.name, "image tag must not be empty"));
    }
}

fn check_route(desc: &ServiceDescriptor, out: &mut Vec<Violation>) {
    match (&desc.route_path, desc.priority) {
        (None, Some(priority)) => out.push(Violation::new(
            &desc.name,
            format!("priority {priority} set without a route path"),
        )),
        (Some(path), priority) => {
            if !path.starts_with('/') {
                out.push(Violation::new(
                    &desc.name,
                    format!("route path \"{path}\" must start with '/'"),
                ));
            }
            if path.len() > constants::MAX_PATH_PATTERN_LEN {
                out.push(Violation::new(
                    &desc.name,
                    format!(
                        "route path is longer than {} characters",
                        constants::MAX_PATH_PATTERN_LEN
                    ),
                ));
            }
            if let Some(p) = priority {
                if !(constants::MIN_RULE_PRIORITY..=constants::MAX_RULE_PRIORITY).contains(&p) {
                    out.push(Violation::new(
                        &desc.name,
                        format!(
                            "priority {p} is outside {}..={}",
                            constants::MIN_RULE_PRIORITY,
                            constants::MAX_RULE_PRIORITY
                        ),
                    ));
                }
            }
        }
        (None, None) => {}
    }
}

fn check_duplicate_names(descriptors: &[ServiceDescriptor], out: &mut Vec<Violation>) {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for desc in descriptors {
        let count = seen.entry(desc.name.as_str()).or_insert(0);
        *count += 1;
        if *count == 2 {
            out.push(Violation::new(&desc.name, "name is used by more than one service"));
        }
    }
}

fn check_duplicate_paths(descriptors: &[ServiceDescriptor], out: &mut Vec<Violation>) {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    for desc in descriptors {
        let Some(path) = desc.route_path.as_deref() else {
            continue;
        };
        if let Some(first) = owners.get(path) {
            out.push(Violation::new(
                &desc.name,
                format!("route path \"{path}\" is already routed to \"{first}\""),
            ));
        } else {
            let _ = owners.insert(path, desc.name.as_str());
        }
    }
}
