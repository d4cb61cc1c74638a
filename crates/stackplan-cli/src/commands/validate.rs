//! `stackplan validate`: Check a manifest without printing the graph.

use std::path::PathBuf;

use clap::Args;

use stackplan_common::constants;

/// Arguments for the `validate` command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the manifest.
    #[arg(default_value = constants::DEFAULT_MANIFEST)]
    pub file: PathBuf,
}

/// Executes the `validate` command.
///
/// Prints the node count and plan fingerprint on success.
///
/// # Errors
///
/// Returns the first planning error, which lists every topology violation.
pub fn execute(args: &ValidateArgs) -> anyhow::Result<()> {
    let plan = super::load_plan(&args.file)?;
    let fingerprint = plan.graph().fingerprint()?;
    crate::output::emit(
        &format!(
            "{}: ok, {} resource(s), fingerprint {fingerprint}\n",
            args.file.display(),
            plan.graph().len()
        ),
        None,
    )
}
