//! Configuration models for the planned infrastructure.
//!
//! Every field carries a serde default so a manifest only has to spell out
//! what differs from the stock single-cluster layout.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{PlanError, Result};

/// Smallest network prefix accepted for the address space.
const MIN_NETWORK_PREFIX: u8 = 16;
/// Largest network prefix accepted for the address space.
const MAX_NETWORK_PREFIX: u8 = 28;

fn config_err(message: String) -> PlanError {
    PlanError::Config { message }
}

/// Address space and zone spread of the virtual network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    /// IPv4 address space in CIDR notation.
    #[serde(default = "default_cidr")]
    pub cidr: String,
    /// Number of availability zones to spread subnets across.
    #[serde(default = "default_max_azs")]
    pub max_azs: u8,
}

fn default_cidr() -> String {
    constants::DEFAULT_NETWORK_CIDR.to_string()
}

const fn default_max_azs() -> u8 {
    constants::DEFAULT_MAX_AZS
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cidr: default_cidr(),
            max_azs: default_max_azs(),
        }
    }
}

impl NetworkConfig {
    /// Returns the prefix length of the address space.
    ///
    /// # Errors
    ///
    /// Returns an error if `cidr` is not `a.b.c.d/p` with a prefix between
    /// /16 and /28.
    pub fn prefix_len(&self) -> Result<u8> {
        let (addr, prefix) = self
            .cidr
            .split_once('/')
            .ok_or_else(|| config_err(format!("network cidr \"{}\" has no prefix length", self.cidr)))?;
        let _: Ipv4Addr = addr
            .parse()
            .map_err(|_| config_err(format!("network cidr \"{}\" has an invalid address", self.cidr)))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| config_err(format!("network cidr \"{}\" has an invalid prefix", self.cidr)))?;
        if !(MIN_NETWORK_PREFIX..=MAX_NETWORK_PREFIX).contains(&prefix) {
            return Err(config_err(format!(
                "network prefix /{prefix} is outside /{MIN_NETWORK_PREFIX}../{MAX_NETWORK_PREFIX}"
            )));
        }
        Ok(prefix)
    }

    /// Validates the network configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the CIDR is malformed or the zone count is out of range.
    pub fn validate(&self) -> Result<()> {
        let _ = self.prefix_len()?;
        if self.max_azs == 0 || self.max_azs > constants::MAX_AZS {
            return Err(config_err(format!(
                "max_azs must be between 1 and {}, got {}",
                constants::MAX_AZS,
                self.max_azs
            )));
        }
        Ok(())
    }
}

/// The orchestration cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterConfig {
    /// Display name of the cluster.
    #[serde(default = "default_cluster_name")]
    pub name: String,
}

fn default_cluster_name() -> String {
    constants::DEFAULT_CLUSTER_NAME.to_string()
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            name: default_cluster_name(),
        }
    }
}

/// The shared load balancer and its single listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadBalancerConfig {
    /// Name of the load balancer.
    #[serde(default = "default_lb_name")]
    pub name: String,
    /// Whether the load balancer gets a public address.
    #[serde(default = "default_true")]
    pub internet_facing: bool,
    /// Port the listener accepts HTTP traffic on.
    #[serde(default = "default_listener_port")]
    pub listener_port: u16,
    /// Whether the listener is reachable from any address.
    #[serde(default = "default_true")]
    pub open: bool,
}

fn default_lb_name() -> String {
    constants::DEFAULT_LOAD_BALANCER_NAME.to_string()
}

const fn default_listener_port() -> u16 {
    constants::DEFAULT_LISTENER_PORT
}

const fn default_true() -> bool {
    true
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            name: default_lb_name(),
            internet_facing: true,
            listener_port: default_listener_port(),
            open: true,
        }
    }
}

impl LoadBalancerConfig {
    /// Validates the load balancer configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, too long, or the port is zero.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.len() > constants::MAX_LOAD_BALANCER_NAME_LEN {
            return Err(config_err(format!(
                "load balancer name \"{}\" must be 1 to {} characters",
                self.name,
                constants::MAX_LOAD_BALANCER_NAME_LEN
            )));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(config_err(format!(
                "load balancer name \"{}\" may only contain alphanumerics and hyphens",
                self.name
            )));
        }
        if self.listener_port == 0 {
            return Err(config_err("listener port must be positive".into()));
        }
        Ok(())
    }
}

/// The alias record pointing at the load balancer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DnsConfig {
    /// Domain name of the hosted zone.
    pub zone: String,
    /// Record name relative to the zone.
    pub record_name: String,
    /// Record TTL in seconds.
    #[serde(default = "default_ttl")]
    pub ttl_seconds: i64,
    /// Free-form comment attached to the record.
    #[serde(default)]
    pub comment: Option<String>,
}

const fn default_ttl() -> i64 {
    constants::DEFAULT_DNS_TTL_SECONDS
}

/// Sizing and tag applied to services that do not set their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceDefaults {
    /// Task CPU units.
    #[serde(default = "default_cpu")]
    pub cpu_units: u32,
    /// Task memory in MiB.
    #[serde(default = "default_memory")]
    pub memory_mib: u32,
    /// Image tag.
    #[serde(default = "default_tag")]
    pub image_tag: String,
}

const fn default_cpu() -> u32 {
    constants::DEFAULT_CPU_UNITS
}

const fn default_memory() -> u32 {
    constants::DEFAULT_MEMORY_MIB
}

fn default_tag() -> String {
    constants::DEFAULT_IMAGE_TAG.to_string()
}

impl Default for ServiceDefaults {
    fn default() -> Self {
        Self {
            cpu_units: default_cpu(),
            memory_mib: default_memory(),
            image_tag: default_tag(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_network_is_valid() {
        let network = NetworkConfig::default();
        assert_eq!(network.prefix_len().expect("prefix"), 16);
        assert!(network.validate().is_ok());
    }

    #[test]
    fn network_rejects_missing_prefix() {
        let network = NetworkConfig {
            cidr: "10.0.0.0".into(),
            ..NetworkConfig::default()
        };
        let msg = network.validate().unwrap_err().to_string();
        assert!(msg.contains("no prefix length"), "got: {msg}");
    }

    #[test]
    fn network_rejects_oversized_prefix() {
        let network = NetworkConfig {
            cidr: "10.0.0.0/8".into(),
            ..NetworkConfig::default()
        };
        assert!(network.validate().is_err());
    }

    #[test]
    fn network_rejects_zero_zones() {
        let network = NetworkConfig {
            max_azs: 0,
            ..NetworkConfig::default()
        };
        let msg = network.validate().unwrap_err().to_string();
        assert!(msg.contains("max_azs"), "got: {msg}");
    }

    #[test]
    fn load_balancer_rejects_long_name() {
        let lb = LoadBalancerConfig {
            name: "x".repeat(33),
            ..LoadBalancerConfig::default()
        };
        assert!(lb.validate().is_err());
        assert!(LoadBalancerConfig::default().validate().is_ok());
    }

    #[test]
    fn load_balancer_rejects_zero_port() {
        let lb = LoadBalancerConfig {
            listener_port: 0,
            ..LoadBalancerConfig::default()
        };
        let msg = lb.validate().unwrap_err().to_string();
        assert!(msg.contains("listener port"), "got: {msg}");
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let defaults: ServiceDefaults = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(defaults, ServiceDefaults::default());
        assert_eq!(defaults.cpu_units, 256);
        assert_eq!(defaults.memory_mib, 512);
        assert_eq!(defaults.image_tag, "latest");
    }
}
