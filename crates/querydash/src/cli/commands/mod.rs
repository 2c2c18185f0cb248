pub mod catalog;
pub mod report;
pub mod run;
pub mod seed;
pub mod sources;
pub mod sql;

use anyhow::{Context, Result};
use serde_json::{Value, json};

use crate::config::RuntimePaths;
use crate::models::{QueryEnvelope, QueryResult};
use crate::report::ReportRegistry;
use crate::session::{Dashboard, RunError};
use crate::source::{SourceConfig, SourceRegistry};

/// Resolves the selected source and opens a session on it. Configuration
/// errors are returned as-is so `main` can classify them.
pub fn open_dashboard(runtime_paths: &RuntimePaths, source_id: &str) -> Result<Dashboard> {
    let registry = SourceRegistry::from_runtime(runtime_paths)?;
    let source = SourceConfig::load(&registry, source_id, &runtime_paths.sources_root)?;
    let reports = ReportRegistry::for_source(&source);
    Ok(Dashboard::open(source, reports))
}

#[must_use]
pub fn load_warnings(dashboard: &Dashboard) -> Vec<(String, String)> {
    let catalog = dashboard
        .diagnostics()
        .iter()
        .map(|diagnostic| (diagnostic.code().to_string(), diagnostic.to_string()));
    let reports = dashboard
        .reports()
        .diagnostics()
        .iter()
        .map(|diagnostic| ("report_definition_skipped".to_string(), diagnostic.to_string()));
    catalog.chain(reports).collect()
}

#[must_use]
pub fn table_data(result: &QueryResult) -> Value {
    json!({
        "columns": result.columns,
        "rows": result.rows,
    })
}

#[must_use]
pub fn run_failure(
    command: &str,
    dashboard: &Dashboard,
    request: Value,
    error: &RunError,
) -> anyhow::Error {
    QueryEnvelope::error(command, error.code(), error.to_string())
        .with_request(request)
        .with_data(table_data(&QueryResult::empty()))
        .with_meta("source", json!(dashboard.source().source()))
        .with_warnings(load_warnings(dashboard))
        .into_failure()
}

pub fn emit(envelope: &QueryEnvelope) -> Result<()> {
    let encoded = serde_json::to_string(envelope).context("failed to encode envelope")?;
    println!("{encoded}");
    Ok(())
}

pub fn parse_param(raw: &str) -> std::result::Result<(String, String), String> {
    let Some((name, value)) = raw.split_once('=') else {
        return Err(format!("expected NAME=VALUE, got `{raw}`"));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("parameter name is empty in `{raw}`"));
    }
    Ok((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::parse_param;

    #[test]
    fn parses_param_pairs() {
        assert_eq!(
            parse_param("ticker=AAPL"),
            Ok(("ticker".to_string(), "AAPL".to_string()))
        );
        assert_eq!(
            parse_param("note=a=b"),
            Ok(("note".to_string(), "a=b".to_string()))
        );
        assert!(parse_param("ticker").is_err());
        assert!(parse_param("=AAPL").is_err());
    }
}
