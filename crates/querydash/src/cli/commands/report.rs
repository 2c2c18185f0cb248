use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use crate::config::RuntimePaths;
use crate::models::QueryEnvelope;
use crate::report::{render_text, report_key};

use super::run::{QueryInput, execute_input, request_json};
use super::{emit, load_warnings, open_dashboard, run_failure};

#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub input: QueryInput,

    /// Print the report as plain text instead of a JSON envelope.
    #[arg(long, default_value_t = false)]
    pub text: bool,
}

pub fn run(args: &ReportArgs, runtime_paths: &RuntimePaths, source_id: &str) -> Result<()> {
    let dashboard = open_dashboard(runtime_paths, source_id)?;
    let (query, outcome, duration_ms) = execute_input(&dashboard, &args.input);

    if let Some(error) = &outcome.error {
        println!("report: failed code={} duration_ms={duration_ms}", error.code());
        let request = request_json(&query, &args.input);
        return Err(run_failure("report", &dashboard, request, error));
    }

    let custom = dashboard.reports().get(&query).is_some();
    let payload = dashboard.report(&query, &outcome.result);
    println!(
        "report: complete rows={} provider={} duration_ms={duration_ms}",
        outcome.result.row_count(),
        if custom { report_key(&query) } else { "summary" }
    );

    if args.text {
        println!("{}", render_text(&payload));
        return Ok(());
    }

    let data = serde_json::to_value(&payload).context("failed to encode report payload")?;
    emit(
        &QueryEnvelope::ok("report", data)
            .with_meta("source", json!(dashboard.source().source()))
            .with_meta("query", json!(query))
            .with_meta("row_count", json!(outcome.result.row_count()))
            .with_meta("custom_report", json!(custom))
            .with_warnings(load_warnings(&dashboard)),
    )
}
