use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::config::RuntimePaths;
use crate::models::QueryEnvelope;
use crate::seed::write_sample_database;
use crate::source::builtin::example_database_path;

use super::emit;

#[derive(Debug, Clone, Args)]
pub struct SeedArgs {
    /// Target database; defaults to the `example` source database.
    #[arg(long, value_name = "PATH")]
    pub database: Option<PathBuf>,
}

pub fn run(args: &SeedArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let database = match &args.database {
        Some(path) if path.is_absolute() => path.clone(),
        Some(path) => runtime_paths.cwd.join(path),
        None => example_database_path(&runtime_paths.sources_root),
    };
    println!("seed: start database={}", database.display());

    let stats = write_sample_database(&database)?;
    println!("seed: complete rows={}", stats.total_rows());

    emit(
        &QueryEnvelope::ok(
            "seed",
            json!({
                "database": database.display().to_string(),
                "tables": {
                    "stock_prices": stats.stock_prices,
                    "company_financials": stats.company_financials,
                    "market_indices": stats.market_indices,
                },
            }),
        )
        .with_meta("row_count", json!(stats.total_rows())),
    )
}
