use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::bind::{
    BindError, BoundQuery, InputSlot, ParamValues, bind_literal, bind_template, values_from_slots,
};
use crate::catalog::{CatalogLoadError, QueryCatalog};
use crate::execute::{ExecError, execute};
use crate::models::QueryResult;
use crate::report::{ReportPayload, ReportRegistry};
use crate::source::SourceConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("query `{0}` is not in the catalog")]
    UnknownQuery(String),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl RunError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownQuery(_) => "run_unknown_query",
            Self::Bind(error) => error.code(),
            Self::Exec(error) => error.code(),
        }
    }
}

/// Result of one request. `error` set means `result` is the empty table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub result: QueryResult,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_error")]
    pub error: Option<RunError>,
}

impl RunOutcome {
    fn from_result(result: Result<QueryResult, RunError>) -> Self {
        match result {
            Ok(result) => Self {
                result,
                error: None,
            },
            Err(error) => Self {
                result: QueryResult::empty(),
                error: Some(error),
            },
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<RunError>) -> Self {
        Self::from_result(Err(error.into()))
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

fn serialize_error<S>(error: &Option<RunError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match error {
        Some(error) => {
            json!({"code": error.code(), "message": error.to_string()}).serialize(serializer)
        }
        None => serializer.serialize_none(),
    }
}

pub struct Dashboard {
    source: Arc<SourceConfig>,
    catalog: QueryCatalog,
    diagnostics: Vec<CatalogLoadError>,
    reports: ReportRegistry,
}

impl Dashboard {
    /// Loads the catalog once; later file changes need a new session.
    #[must_use]
    pub fn open(source: impl Into<Arc<SourceConfig>>, reports: ReportRegistry) -> Self {
        let source = source.into();
        let load = QueryCatalog::load(source.queries_dir(), source.placeholder_matcher());
        Self {
            source,
            catalog: load.catalog,
            diagnostics: load.diagnostics,
            reports,
        }
    }

    #[must_use]
    pub fn source(&self) -> &SourceConfig {
        &self.source
    }

    #[must_use]
    pub const fn catalog(&self) -> &QueryCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[CatalogLoadError] {
        &self.diagnostics
    }

    #[must_use]
    pub const fn reports(&self) -> &ReportRegistry {
        &self.reports
    }

    #[must_use]
    pub fn catalog_view(&self) -> Value {
        json!({
            "queries": self.catalog,
            "max_params": self.catalog.max_params(),
        })
    }

    pub fn bind_query(&self, name: &str, values: &ParamValues) -> Result<BoundQuery, RunError> {
        let template = self
            .catalog
            .get(name)
            .ok_or_else(|| RunError::UnknownQuery(name.to_string()))?;
        Ok(bind_template(template, values, self.source.substitution_mode())?)
    }

    #[must_use]
    pub fn run_query(&self, name: &str, values: &ParamValues) -> RunOutcome {
        RunOutcome::from_result(
            self.bind_query(name, values)
                .and_then(|bound| self.execute(&bound)),
        )
    }

    #[must_use]
    pub fn run_query_slots(&self, name: &str, slots: &[InputSlot]) -> RunOutcome {
        let values = values_from_slots(self.catalog.get_params(name), slots);
        RunOutcome::from_result(
            values
                .map_err(RunError::from)
                .and_then(|values| self.bind_query(name, &values))
                .and_then(|bound| self.execute(&bound)),
        )
    }

    #[must_use]
    pub fn run_sql(&self, sql: &str) -> RunOutcome {
        RunOutcome::from_result(self.execute(&bind_literal(sql)))
    }

    #[must_use]
    pub fn report(&self, name: &str, table: &QueryResult) -> ReportPayload {
        self.reports.build_report(name, table)
    }

    fn execute(&self, bound: &BoundQuery) -> Result<QueryResult, RunError> {
        Ok(execute(bound, &self.source)?)
    }
}
