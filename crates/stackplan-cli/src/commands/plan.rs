//! `stackplan plan`: Compile a manifest and print the resource graph.

use std::path::PathBuf;

use clap::Args;

use stackplan_common::constants;

use crate::output::{self, OutputFormat};

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the manifest.
    #[arg(default_value = constants::DEFAULT_MANIFEST)]
    pub file: PathBuf,

    /// Output format.
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write the plan to this file instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Executes the `plan` command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be compiled or the plan cannot
/// be written.
pub fn execute(args: &PlanArgs) -> anyhow::Result<()> {
    let plan = super::load_plan(&args.file)?;
    let rendered = output::render(&plan, &args.file, args.format)?;
    output::emit(&rendered, args.output.as_deref())?;
    tracing::info!(
        nodes = plan.graph().len(),
        format = ?args.format,
        "plan written"
    );
    Ok(())
}
