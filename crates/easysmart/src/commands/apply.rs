//! `apply`: converge the switch to a declaration file.

use serde::Serialize;
use tracing::info;

use easysmart_core::{ConfigDiff, Reconciler};

use crate::cli::{ApplyArgs, GlobalOpts, OutputFormat};
use crate::commands::changed_line;
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct Report<'a> {
    changed: bool,
    check: bool,
    diff: &'a ConfigDiff,
    #[serde(skip_serializing_if = "Option::is_none")]
    rendered: Option<String>,
}

pub async fn handle(args: ApplyArgs, global: &GlobalOpts) -> Result<(), CliError> {
    // A broken declaration fails before any packet is sent.
    let declaration = easysmart_config::load_declaration(&args.file)?;

    let resolved = config::resolve(global)?;
    let switch_mac = resolved.require_switch_mac(global)?;
    let credentials = resolved.credentials(global)?;
    let (host, egress) = resolved.host_interface(global)?;
    let mut client = config::connect(&host, egress, switch_mac, resolved.timeout(), credentials)?;
    client
        .login()
        .await
        .map_err(|e| CliError::from_core(e, &resolved.name))?;

    let mut reconciler = Reconciler::new(client);
    let outcome = reconciler
        .reconcile(&declaration, args.check)
        .await
        .map_err(|e| CliError::from_core(e, &resolved.name))?;
    info!(
        changed = outcome.changed,
        check = args.check,
        file = %args.file.display(),
        "apply finished"
    );

    let show_diff = args.diff || args.check;
    let rendered = outcome.diff.render();
    let out = match global.output() {
        OutputFormat::Json | OutputFormat::Yaml => {
            let report = Report {
                changed: outcome.changed,
                check: args.check,
                diff: &outcome.diff,
                rendered: show_diff.then_some(rendered),
            };
            output::render_single(&global.output(), &report, |_| String::new(), |_| String::new())
        }
        OutputFormat::Plain => outcome.changed.to_string(),
        OutputFormat::Table => {
            let mut lines = Vec::new();
            if show_diff && !rendered.is_empty() {
                lines.push(output::colorize_diff(
                    &rendered,
                    output::should_color(&global.color),
                ));
            }
            lines.push(changed_line(outcome.changed));
            lines.join("\n")
        }
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
