//! `stackplan route`: Preview where a request path is forwarded.

use std::path::PathBuf;

use clap::Args;

use stackplan_common::constants;

/// Arguments for the `route` command.
#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Request path to route, e.g. `/nav.js`.
    pub path: String,

    /// Path to the manifest.
    #[arg(long, short, default_value = constants::DEFAULT_MANIFEST)]
    pub file: PathBuf,
}

/// Executes the `route` command.
///
/// Evaluates the listener rules in priority order, falling back to the
/// default action.
///
/// # Errors
///
/// Returns an error if the manifest cannot be compiled.
pub fn execute(args: &RouteArgs) -> anyhow::Result<()> {
    let plan = super::load_plan(&args.file)?;
    let outcome = plan.listener().route(&args.path);
    crate::output::emit(&crate::output::render_route(&args.path, &outcome), None)
}
