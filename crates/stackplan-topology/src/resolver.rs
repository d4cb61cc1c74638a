//! Resource reference resolution.
//!
//! Turns external identifiers into opaque [`Handle`]s. Only the shape of an
//! identifier is checked; whether the resource exists is up to the
//! provisioning engine at execution time.

use stackplan_common::constants;
use stackplan_common::error::{PlanError, Result};
use stackplan_common::types::{Handle, ResourceKind};

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

fn rejected(kind: ResourceKind, identifier: &str, reason: impl Into<String>) -> PlanError {
    PlanError::Resolution {
        kind,
        identifier: identifier.to_string(),
        reason: reason.into(),
    }
}

/// Resolves `identifier` into a handle of the given kind.
///
/// # Accepted forms
///
/// - `ImageRegistry`: a repository ARN (`arn:aws:ecr:<region>:<account>:repository/<name>`)
///   or a registry path (`<registry-host>/<repository>`).
/// - `DnsZone`: a domain name; a trailing dot is stripped.
/// - `LoadBalancer`: a load balancer ARN.
///
/// # Errors
///
/// Returns [`PlanError::Resolution`] if the identifier is empty or does not
/// have the shape of the requested kind.
pub fn resolve(kind: ResourceKind, identifier: &str) -> Result<Handle> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(rejected(kind, identifier, "identifier is empty"));
    }
    if trimmed.len() != identifier.len() {
        return Err(rejected(kind, identifier, "identifier has surrounding whitespace"));
    }

    let canonical = match kind {
        ResourceKind::ImageRegistry => check_image_registry(identifier)?,
        ResourceKind::DnsZone => check_dns_zone(identifier)?,
        ResourceKind::LoadBalancer => check_load_balancer(identifier)?,
    };
    tracing::debug!(%kind, identifier = canonical, "resolved reference");
    Ok(Handle::external(kind, canonical))
}

fn check_image_registry(identifier: &str) -> Result<&str> {
    let kind = ResourceKind::ImageRegistry;
    if let Some(rest) = identifier.strip_prefix(constants::IMAGE_REGISTRY_PREFIX) {
        let mut parts = rest.splitn(3, ':');
        let region = parts.next().unwrap_or_default();
        let account = parts.next().unwrap_or_default();
        let resource = parts.next().unwrap_or_default();
        if region.is_empty() {
            return Err(rejected(kind, identifier, "repository ARN has no region"));
        }
        if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
            return Err(rejected(kind, identifier, "repository ARN has no 12 digit account id"));
        }
        match resource.strip_prefix("repository/") {
            Some(name) if !name.is_empty() => Ok(identifier),
            _ => Err(rejected(kind, identifier, "repository ARN has no repository name")),
        }
    } else if identifier.starts_with("arn:") {
        Err(rejected(kind, identifier, "ARN does not name a container repository"))
    } else {
        let (host, repository) = identifier
            .split_once('/')
            .ok_or_else(|| rejected(kind, identifier, "registry path has no repository"))?;
        if !host.contains('.') {
            return Err(rejected(kind, identifier, "registry path has no registry host"));
        }
        if repository.is_empty() || repository.split('/').any(str::is_empty) {
            return Err(rejected(kind, identifier, "registry path has an empty repository segment"));
        }
        Ok(identifier)
    }
}

fn check_dns_zone(identifier: &str) -> Result<&str> {
    let kind = ResourceKind::DnsZone;
    if identifier.starts_with("arn:") {
        return Err(rejected(kind, identifier, "expected a domain name, got an ARN"));
    }
    let domain = identifier.strip_suffix('.').unwrap_or(identifier);
    if domain.len() > MAX_DOMAIN_LEN {
        return Err(rejected(kind, identifier, "domain name is too long"));
    }
    if !domain.contains('.') {
        return Err(rejected(kind, identifier, "domain name has a single label"));
    }
    if let Some(label) = domain.split('.').find(|l| !is_dns_label(l)) {
        return Err(rejected(kind, identifier, format!("invalid domain label \"{label}\"")));
    }
    Ok(domain)
}

fn check_load_balancer(identifier: &str) -> Result<&str> {
    match identifier.strip_prefix(constants::LOAD_BALANCER_PREFIX) {
        Some(rest) if rest.contains("loadbalancer/") => Ok(identifier),
        Some(_) => Err(rejected(
            ResourceKind::LoadBalancer,
            identifier,
            "ARN does not name a load balancer",
        )),
        None => Err(rejected(
            ResourceKind::LoadBalancer,
            identifier,
            "expected a load balancer ARN",
        )),
    }
}

/// Returns true if `label` is a valid DNS label.
pub(crate) fn is_dns_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAV_REPO: &str = "arn:aws:ecr:us-east-1:123456789012:repository/navigation-app";

    #[test]
    fn resolves_repository_arn() {
        let handle = resolve(ResourceKind::ImageRegistry, NAV_REPO).expect("resolve");
        assert_eq!(handle.kind(), ResourceKind::ImageRegistry);
        assert_eq!(handle.as_str(), NAV_REPO);
        assert_eq!(handle.planned_node(), None);
    }

    #[test]
    fn resolves_registry_path() {
        let handle = resolve(
            ResourceKind::ImageRegistry,
            "123456789012.dkr.ecr.us-east-1.amazonaws.com/team/home-app",
        )
        .expect("resolve");
        assert_eq!(handle.kind(), ResourceKind::ImageRegistry);
    }

    #[test]
    fn rejects_empty_identifier() {
        for id in ["", "   "] {
            let err = resolve(ResourceKind::ImageRegistry, id).unwrap_err();
            assert!(matches!(err, PlanError::Resolution { .. }), "got: {err}");
        }
    }

    #[test]
    fn rejects_wrong_arn_kind_for_image() {
        let err = resolve(
            ResourceKind::ImageRegistry,
            "arn:aws:s3:::bucket/navigation-app",
        )
        .unwrap_err();
        assert!(err.to_string().contains("container repository"), "got: {err}");
    }

    #[test]
    fn rejects_repository_arn_without_name() {
        let err = resolve(
            ResourceKind::ImageRegistry,
            "arn:aws:ecr:us-east-1:123456789012:repository/",
        )
        .unwrap_err();
        assert!(err.to_string().contains("repository name"), "got: {err}");
    }

    #[test]
    fn rejects_repository_arn_with_bad_account() {
        let err = resolve(
            ResourceKind::ImageRegistry,
            "arn:aws:ecr:us-east-1:acct:repository/app",
        )
        .unwrap_err();
        assert!(err.to_string().contains("account"), "got: {err}");
    }

    #[test]
    fn resolves_zone_and_strips_trailing_dot() {
        let handle = resolve(ResourceKind::DnsZone, "example.com.").expect("resolve");
        assert_eq!(handle.as_str(), "example.com");
    }

    #[test]
    fn rejects_arn_as_zone() {
        let err = resolve(ResourceKind::DnsZone, NAV_REPO).unwrap_err();
        assert!(err.to_string().contains("got an ARN"), "got: {err}");
    }

    #[test]
    fn rejects_malformed_zone() {
        assert!(resolve(ResourceKind::DnsZone, "localhost").is_err());
        assert!(resolve(ResourceKind::DnsZone, "bad_label.com").is_err());
        assert!(resolve(ResourceKind::DnsZone, "-lead.example.com").is_err());
        assert!(resolve(ResourceKind::DnsZone, "a..b").is_err());
    }

    #[test]
    fn resolves_load_balancer_arn() {
        let arn = "arn:aws:elasticloadbalancing:us-east-1:123456789012:loadbalancer/app/ServicesLB/50dc6c495c0c9188";
        let handle = resolve(ResourceKind::LoadBalancer, arn).expect("resolve");
        assert_eq!(handle.kind(), ResourceKind::LoadBalancer);
        assert!(resolve(ResourceKind::LoadBalancer, "ServicesLB").is_err());
    }

    #[test]
    fn dns_label_rules() {
        assert!(is_dns_label("services"));
        assert!(is_dns_label("api-v2"));
        assert!(!is_dns_label(""));
        assert!(!is_dns_label("trailing-"));
        assert!(!is_dns_label(&"a".repeat(64)));
    }
}
