use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::config::RuntimePaths;
use crate::models::QueryEnvelope;

use super::{emit, load_warnings, open_dashboard};

#[derive(Debug, Clone, Args)]
pub struct CatalogArgs {
    /// Only list query names.
    #[arg(long, default_value_t = false)]
    pub names: bool,
}

pub fn run(args: &CatalogArgs, runtime_paths: &RuntimePaths, source_id: &str) -> Result<()> {
    let dashboard = open_dashboard(runtime_paths, source_id)?;
    let catalog = dashboard.catalog();
    println!(
        "catalog: loaded source={} templates={} skipped={} max_params={}",
        dashboard.source().source(),
        catalog.len(),
        dashboard.diagnostics().len(),
        catalog.max_params()
    );

    let data = if args.names {
        json!({ "names": catalog.names().collect::<Vec<_>>() })
    } else {
        dashboard.catalog_view()
    };

    emit(
        &QueryEnvelope::ok("catalog", data)
            .with_meta("source", json!(dashboard.source().source()))
            .with_meta(
                "queries_dir",
                json!(dashboard.source().queries_dir().display().to_string()),
            )
            .with_meta("template_count", json!(catalog.len()))
            .with_meta(
                "reports",
                json!(dashboard.reports().names().collect::<Vec<_>>()),
            )
            .with_warnings(load_warnings(&dashboard)),
    )
}
