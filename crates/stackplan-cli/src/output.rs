//! Formatted output helpers for CLI commands.
//!
//! Renders a compiled plan as a human-readable summary or as one of the
//! wire formats, and writes it to stdout or a file.

use std::fmt::{self, Write as _};
use std::io::Write as _;
use std::path::Path;

use anyhow::Context;
use clap::ValueEnum;

use stackplan_topology::DeploymentPlan;
use stackplan_topology::routing::RouteOutcome;

const RULE: &str = "\u{2550}";
const RULE_WIDTH: usize = 35;

/// Output format of `stackplan plan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    Text,
    /// The resource graph as pretty-printed JSON.
    Json,
    /// The resource graph as YAML.
    Yaml,
}

/// Renders `plan` in `format`. `source` is only shown in the text summary.
///
/// # Errors
///
/// Returns an error if serialization or ordering fails.
pub fn render(
    plan: &DeploymentPlan,
    source: &Path,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let rendered = match format {
        OutputFormat::Text => {
            let order = plan.deployment_order()?;
            let fingerprint = plan.graph().fingerprint()?;
            let mut out = String::new();
            let _ = write_summary(&mut out, plan, source, &order, &fingerprint);
            out
        }
        OutputFormat::Json => {
            let mut json = plan.graph().to_json()?;
            json.push('\n');
            json
        }
        OutputFormat::Yaml => plan.graph().to_yaml()?,
    };
    Ok(rendered)
}

fn write_summary(
    out: &mut String,
    plan: &DeploymentPlan,
    source: &Path,
    order: &[&str],
    fingerprint: &str,
) -> fmt::Result {
    writeln!(out, "Deployment plan for: {}", source.display())?;
    writeln!(out, "{}", RULE.repeat(RULE_WIDTH))?;
    writeln!(out)?;

    let width = order.iter().map(|id| id.len()).max().unwrap_or(0);
    for id in order {
        let Some(node) = plan.graph().node(id) else {
            continue;
        };
        write!(out, "  + {id:<width$}  {}", node.kind())?;
        if !node.depends_on().is_empty() {
            write!(out, "  <- {}", node.depends_on().join(", "))?;
        }
        writeln!(out)?;
    }

    let listener = plan.listener();
    writeln!(out)?;
    writeln!(out, "  Listener :{} ({})", listener.port(), listener.state())?;
    for rule in listener.rules() {
        writeln!(
            out,
            "    {:>5}  {} -> {}",
            rule.priority, rule.path_pattern, rule.target_group
        )?;
    }
    match listener.default_action() {
        Some(default) => writeln!(out, "    {:>5}  (default) -> {}", "*", default.target_group)?,
        None => writeln!(out, "    {:>5}  (no default action)", "*")?,
    }

    if let Some(record) = plan.dns_record() {
        writeln!(out)?;
        writeln!(out, "  DNS")?;
        writeln!(
            out,
            "    {} -> {} (ttl {}s)",
            record.fqdn, record.target, record.ttl_seconds
        )?;
    }

    writeln!(out)?;
    writeln!(out, "  {} resource(s) will be planned.", order.len())?;
    writeln!(out, "  fingerprint: {fingerprint}")
}

/// Renders a deployment order, one numbered id per line.
#[must_use]
pub fn render_order(order: &[&str]) -> String {
    let width = order.len().to_string().len();
    order
        .iter()
        .enumerate()
        .map(|(i, id)| format!("{:>width$}. {id}\n", i + 1))
        .collect()
}

/// Describes where `path` ends up.
#[must_use]
pub fn render_route(path: &str, outcome: &RouteOutcome<'_>) -> String {
    match outcome {
        RouteOutcome::Rule(rule) => format!(
            "{path} -> {} (rule {} matches \"{}\", target group {})\n",
            rule.service, rule.priority, rule.path_pattern, rule.target_group
        ),
        RouteOutcome::Default(default) => format!(
            "{path} -> {} (default action, target group {})\n",
            default.service, default.target_group
        ),
        RouteOutcome::NoMatch => {
            format!("{path} -> no route (no rule matches and no default action)\n")
        }
    }
}

/// Writes `content` to `output`, or to stdout when `output` is `None`.
///
/// # Errors
///
/// Returns an error if the destination cannot be written.
pub fn emit(content: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}
