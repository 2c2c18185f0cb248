use anyhow::Result;
use clap::Args;
use serde_json::{Value, json};

use crate::config::RuntimePaths;
use crate::models::QueryEnvelope;
use crate::report::report_definition_json_schema;
use crate::source::definition::definitions_json_schema;
use crate::source::{SourceConfig, SourceRegistry};

use super::emit;

#[derive(Debug, Clone, Args)]
pub struct SourcesArgs {
    /// Print the JSON schemas of the definitions and report files instead.
    #[arg(long, default_value_t = false)]
    pub schema: bool,
}

pub fn run(args: &SourcesArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    if args.schema {
        let schemas = json!({
            "sources_file": definitions_json_schema(),
            "report_definition": report_definition_json_schema(),
        });
        return emit(&QueryEnvelope::ok("sources", schemas));
    }

    let registry = SourceRegistry::from_runtime(runtime_paths)?;
    let sources = registry
        .ids()
        .map(|source_id| describe_source(&registry, source_id, runtime_paths))
        .collect::<Vec<_>>();
    let unusable = sources
        .iter()
        .filter(|source| source["ok"] == json!(false))
        .count();
    println!("sources: listed count={} unusable={unusable}", sources.len());

    emit(
        &QueryEnvelope::ok("sources", json!({ "sources": sources }))
            .with_meta(
                "sources_root",
                json!(runtime_paths.sources_root.display().to_string()),
            )
            .with_meta(
                "sources_file",
                json!(runtime_paths.sources_file.display().to_string()),
            )
            .with_meta("sources_file_present", json!(runtime_paths.sources_file.is_file())),
    )
}

fn describe_source(
    registry: &SourceRegistry,
    source_id: &str,
    runtime_paths: &RuntimePaths,
) -> Value {
    match SourceConfig::load(registry, source_id, &runtime_paths.sources_root) {
        Ok(config) => json!({
            "id": source_id,
            "ok": true,
            "connection": config.connection_factory().describe(),
            "placeholder": config.placeholder_matcher().describe(),
            "substitution_mode": config.substitution_mode().as_str(),
            "queries_dir": config.queries_dir().display().to_string(),
            "reports_dir": config.reports_dir().display().to_string(),
        }),
        Err(error) => json!({
            "id": source_id,
            "ok": false,
            "error": error.to_string(),
        }),
    }
}
