//! CLI command definitions and dispatch.

pub mod order;
pub mod plan;
pub mod route;
pub mod validate;

use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};

use stackplan_topology::{DeploymentPlan, Manifest};

/// stackplan: plan container services behind one shared load balancer.
#[derive(Parser, Debug)]
#[command(name = stackplan_common::constants::BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a manifest and print the resulting resource graph.
    Plan(plan::PlanArgs),
    /// Check that a manifest compiles without printing the graph.
    Validate(validate::ValidateArgs),
    /// Print resource ids in deployment order.
    Order(order::OrderArgs),
    /// Show which service a request path would be routed to.
    Route(route::RouteArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Plan(args) => plan::execute(&args),
        Command::Validate(args) => validate::execute(&args),
        Command::Order(args) => order::execute(&args),
        Command::Route(args) => route::execute(&args),
    }
}

/// Loads a manifest from disk and compiles it.
fn load_plan(file: &Path) -> anyhow::Result<DeploymentPlan> {
    let manifest = Manifest::from_path(file)?;
    DeploymentPlan::compile(&manifest)
        .with_context(|| format!("failed to plan {}", file.display()))
}
