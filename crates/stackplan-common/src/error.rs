//! Unified error types for the stackplan workspace.
//!
//! Every planning stage is all-or-nothing: a stage either returns its
//! complete output or one of these errors, never a partial result.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::ResourceKind;

/// A single invariant violated by one service descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Name of the offending service.
    pub service: String,
    /// What is wrong with it.
    pub reason: String,
}

impl Violation {
    /// Creates a violation for `service`.
    #[must_use]
    pub fn new(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service \"{}\": {}", self.service, self.reason)
    }
}

struct ViolationList<'a>(&'a [Violation]);

impl fmt::Display for ViolationList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum PlanError {
    /// An external identifier could not be turned into a handle.
    #[error("cannot resolve {kind} \"{identifier}\": {reason}")]
    Resolution {
        /// Kind the identifier was expected to be.
        kind: ResourceKind,
        /// The rejected identifier.
        identifier: String,
        /// Why it was rejected.
        reason: String,
    },

    /// One or more service descriptors violate the topology invariants.
    #[error("invalid topology ({} violation(s)): {}", violations.len(), ViolationList(violations))]
    InvalidTopology {
        /// Every violation found, in descriptor order.
        violations: Vec<Violation>,
    },

    /// More than one service has no route path.
    #[error("ambiguous default route: services {services:?} all lack a route path")]
    AmbiguousDefaultRoute {
        /// Services competing for the default action.
        services: Vec<String>,
    },

    /// Two routed services ended up with the same rule priority.
    #[error("duplicate routing priority {priority} shared by services {services:?}")]
    DuplicatePriority {
        /// The contested priority.
        priority: u32,
        /// Services sharing it.
        services: Vec<String>,
    },

    /// A DNS record TTL is not a positive number of seconds.
    #[error("invalid DNS record TTL: {ttl_seconds} (must be a positive number of seconds)")]
    InvalidTtl {
        /// The rejected value.
        ttl_seconds: i64,
    },

    /// An attachment was made to a listener that is already fully configured.
    #[error("listener \"{listener}\" is already configured")]
    ListenerSealed {
        /// Listener node id.
        listener: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A manifest document could not be parsed.
    #[error("invalid manifest: {message}")]
    Manifest {
        /// Parser diagnostic.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization of a plan failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl From<serde_yaml::Error> for PlanError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Manifest {
            message: err.to_string(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, PlanError>;
