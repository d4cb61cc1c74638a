//! # stackplan: topology planner CLI
//!
//! Compiles a service manifest into a declarative resource graph.
//! Nothing is provisioned; the output is handed to a provisioning engine.

mod commands;
mod output;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    commands::execute(cli)
}
