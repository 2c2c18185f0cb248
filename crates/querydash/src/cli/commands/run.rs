use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::Result;
use clap::Args;
use serde_json::{Value, json};

use crate::bind::InputSlot;
use crate::catalog::{ParameterSpec, QUERY_FILE_EXTENSION, QueryCatalog};
use crate::config::RuntimePaths;
use crate::models::QueryEnvelope;
use crate::session::{Dashboard, RunOutcome};

use super::{emit, load_warnings, open_dashboard, parse_param, run_failure, table_data};

#[derive(Debug, Clone, Args)]
pub struct QueryInput {
    /// Query file name; the `.sql` extension may be omitted.
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// One value per parameter, in template order.
    #[arg(value_name = "VALUE")]
    pub values: Vec<String>,

    #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: QueryInput,
}

pub fn run(args: &RunArgs, runtime_paths: &RuntimePaths, source_id: &str) -> Result<()> {
    let dashboard = open_dashboard(runtime_paths, source_id)?;
    let (query, outcome, duration_ms) = execute_input(&dashboard, &args.input);

    let Some(error) = &outcome.error else {
        println!(
            "run: complete rows={} duration_ms={duration_ms}",
            outcome.result.row_count()
        );
        let envelope = QueryEnvelope::ok("run", table_data(&outcome.result))
            .with_meta("source", json!(dashboard.source().source()))
            .with_meta("query", json!(query))
            .with_meta("row_count", json!(outcome.result.row_count()))
            .with_meta("duration_ms", json!(duration_ms))
            .with_meta(
                "substitution_mode",
                json!(dashboard.source().substitution_mode().as_str()),
            )
            .with_warnings(load_warnings(&dashboard));
        return emit(&envelope);
    };

    println!("run: failed code={} duration_ms={duration_ms}", error.code());
    let request = request_json(&query, &args.input);
    Err(run_failure("run", &dashboard, request, error))
}

pub fn execute_input(dashboard: &Dashboard, input: &QueryInput) -> (String, RunOutcome, u64) {
    let query = resolve_query_name(dashboard.catalog(), &input.query);
    println!(
        "run: start source={} query={query} values={} params={}",
        dashboard.source().source(),
        input.values.len(),
        input.params.len()
    );

    let slots = input_slots(dashboard.catalog().get_params(&query), input);

    let started = Instant::now();
    let outcome = dashboard.run_query_slots(&query, &slots);
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    (query, outcome, duration_ms)
}

/// One slot per template parameter, so `--param` values are validated like
/// positional ones.
#[must_use]
pub fn input_slots(params: &[ParameterSpec], input: &QueryInput) -> Vec<InputSlot> {
    params
        .iter()
        .enumerate()
        .map(|(index, param)| {
            let value = input
                .params
                .iter()
                .rev()
                .find(|(name, _)| *name == param.name)
                .map(|(_, value)| value)
                .or_else(|| input.values.get(index));
            InputSlot {
                text: value.cloned(),
                date: value.cloned(),
            }
        })
        .collect()
}

#[must_use]
pub fn request_json(query: &str, input: &QueryInput) -> Value {
    json!({
        "query": query,
        "values": input.values,
        "params": input.params.iter().cloned().collect::<BTreeMap<_, _>>(),
    })
}

/// `stock_prices` finds `stock_prices.sql` when only the latter exists.
#[must_use]
pub fn resolve_query_name(catalog: &QueryCatalog, query: &str) -> String {
    if catalog.get(query).is_none() && !query.ends_with(QUERY_FILE_EXTENSION) {
        let with_extension = format!("{query}{QUERY_FILE_EXTENSION}");
        if catalog.get(&with_extension).is_some() {
            return with_extension;
        }
    }
    query.to_string()
}
