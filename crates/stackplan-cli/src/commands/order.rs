//! `stackplan order`: Print resource ids in deployment order.

use std::path::PathBuf;

use clap::Args;

use stackplan_common::constants;

/// Arguments for the `order` command.
#[derive(Args, Debug)]
pub struct OrderArgs {
    /// Path to the manifest.
    #[arg(default_value = constants::DEFAULT_MANIFEST)]
    pub file: PathBuf,
}

/// Executes the `order` command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be compiled.
pub fn execute(args: &OrderArgs) -> anyhow::Result<()> {
    let plan = super::load_plan(&args.file)?;
    let order = plan.deployment_order()?;
    crate::output::emit(&crate::output::render_order(&order), None)
}
