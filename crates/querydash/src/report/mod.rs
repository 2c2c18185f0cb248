use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod definition;
pub mod render;
pub mod summary;

pub use definition::{
    ReportDefinition, SectionDefinition, load_report_definition, report_definition_json_schema,
};
pub use render::render_text;
pub use summary::describe;

use crate::catalog::QUERY_FILE_EXTENSION;
use crate::models::QueryResult;
use crate::source::SourceConfig;

pub const REPORT_FILE_EXTENSION: &str = ".json";
pub const NO_DATA_MESSAGE: &str = "No data available for report.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    Scatter,
}

impl ChartKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Bar => "bar",
            Self::Scatter => "scatter",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub x: String,
    pub y: String,
    pub points: Vec<(Value, Value)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub payload: ReportPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportPayload {
    Table { table: QueryResult },
    Chart { chart: ChartSpec },
    Text { text: String },
    Scalar { value: Value },
    Group { sections: Vec<ReportSection> },
    List { items: Vec<ReportPayload> },
}

impl ReportPayload {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("column `{column}` is not in the result")]
    MissingColumn { column: String },

    #[error("invalid report definition {path}: {message}")]
    InvalidDefinition { path: String, message: String },

    #[error("{0}")]
    Failed(String),

    #[error("report provider panicked: {0}")]
    Panicked(String),
}

pub trait ReportProvider: Send + Sync {
    fn create_report(&self, table: &QueryResult) -> Result<ReportPayload, ReportError>;
}

impl<F> ReportProvider for F
where
    F: Fn(&QueryResult) -> Result<ReportPayload, ReportError> + Send + Sync,
{
    fn create_report(&self, table: &QueryResult) -> Result<ReportPayload, ReportError> {
        self(table)
    }
}

/// Registry key for a query: its file name without `.sql`.
#[must_use]
pub fn report_key(query_name: &str) -> &str {
    query_name
        .strip_suffix(QUERY_FILE_EXTENSION)
        .unwrap_or(query_name)
}

#[derive(Clone, Default)]
pub struct ReportRegistry {
    providers: BTreeMap<String, Arc<dyn ReportProvider>>,
    diagnostics: Vec<ReportError>,
}

impl ReportRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn for_source(source: &SourceConfig) -> Self {
        Self::load_dir(source.reports_dir())
    }

    /// Reads every `*.json` definition in `directory`. A missing directory
    /// means the source has no custom reports.
    #[must_use]
    pub fn load_dir(directory: &Path) -> Self {
        let mut registry = Self::new();

        let entries = match std::fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(directory = %directory.display(), "no reports directory");
                return registry;
            }
            Err(error) => {
                registry.skip(directory.display().to_string(), error.to_string());
                return registry;
            }
        };

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(error) => {
                    registry.skip(directory.display().to_string(), error.to_string());
                    continue;
                }
            };
            let Some(file_name) = path.file_name() else {
                continue;
            };
            let Some(file_name) = file_name.to_str() else {
                let lossy = file_name.to_string_lossy();
                if lossy.ends_with(REPORT_FILE_EXTENSION) {
                    registry.skip(
                        path.display().to_string(),
                        "file name is not valid UTF-8".to_string(),
                    );
                }
                continue;
            };
            let Some(name) = file_name
                .strip_suffix(REPORT_FILE_EXTENSION)
                .map(str::to_string)
            else {
                continue;
            };
            if !path.is_file() {
                continue;
            }

            match load_report_definition(&path) {
                Ok(definition) => registry.register(name, Arc::new(definition)),
                Err(error) => {
                    tracing::warn!(error = %error, "report definition skipped");
                    registry.diagnostics.push(error);
                }
            }
        }

        registry
    }

    fn skip(&mut self, path: String, message: String) {
        tracing::warn!(path = %path, error = %message, "report definition skipped");
        self.diagnostics
            .push(ReportError::InvalidDefinition { path, message });
    }

    pub fn register(&mut self, name: impl AsRef<str>, provider: Arc<dyn ReportProvider>) {
        self.providers
            .insert(report_key(name.as_ref()).to_string(), provider);
    }

    #[must_use]
    pub fn get(&self, query_name: &str) -> Option<Arc<dyn ReportProvider>> {
        self.providers.get(report_key(query_name)).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[ReportError] {
        &self.diagnostics
    }

    #[must_use]
    pub fn build_report(&self, query_name: &str, table: &QueryResult) -> ReportPayload {
        if table.is_empty() {
            return ReportPayload::text(NO_DATA_MESSAGE);
        }

        let Some(provider) = self.get(query_name) else {
            tracing::debug!(query = %query_name, "no report provider; using summary");
            return ReportPayload::Table {
                table: describe(table),
            };
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| provider.create_report(table)))
            .unwrap_or_else(|panic| Err(ReportError::Panicked(panic_message(panic.as_ref()))));

        match outcome {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(query = %query_name, error = %error, "report provider failed");
                ReportPayload::text(format!("Error generating report: {error}"))
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
