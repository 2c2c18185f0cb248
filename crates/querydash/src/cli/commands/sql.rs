use std::time::Instant;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::config::RuntimePaths;
use crate::models::QueryEnvelope;

use super::{emit, open_dashboard, run_failure, table_data};

#[derive(Debug, Clone, Args)]
pub struct SqlArgs {
    /// Self-contained statement; placeholders are not substituted.
    #[arg(value_name = "SQL")]
    pub sql: String,
}

pub fn run(args: &SqlArgs, runtime_paths: &RuntimePaths, source_id: &str) -> Result<()> {
    let dashboard = open_dashboard(runtime_paths, source_id)?;
    println!(
        "sql: start source={} chars={}",
        dashboard.source().source(),
        args.sql.len()
    );

    let started = Instant::now();
    let outcome = dashboard.run_sql(&args.sql);
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    if let Some(error) = &outcome.error {
        println!("sql: failed code={} duration_ms={duration_ms}", error.code());
        return Err(run_failure("sql", &dashboard, json!({"sql": args.sql}), error));
    }

    println!(
        "sql: complete rows={} duration_ms={duration_ms}",
        outcome.result.row_count()
    );
    emit(
        &QueryEnvelope::ok("sql", table_data(&outcome.result))
            .with_meta("source", json!(dashboard.source().source()))
            .with_meta("row_count", json!(outcome.result.row_count()))
            .with_meta("duration_ms", json!(duration_ms)),
    )
}
