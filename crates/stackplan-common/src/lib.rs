//! # stackplan-common
//!
//! Shared error taxonomy, resource handles, configuration models, and
//! constants used across the entire stackplan workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and provides the foundational primitives that the planner
//! and the CLI build upon.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
