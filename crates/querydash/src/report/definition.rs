use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::summary::describe;
use super::{ChartKind, ChartSpec, ReportError, ReportPayload, ReportProvider, ReportSection};
use crate::models::QueryResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ReportDefinition {
    pub sections: Vec<SectionDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SectionDefinition {
    Chart {
        chart: ChartKind,
        x: String,
        y: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Data {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Summary {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
}

impl SectionDefinition {
    fn title(&self) -> String {
        let (title, fallback) = match self {
            Self::Chart { title, .. } => (title, "figure"),
            Self::Data { title } => (title, "data"),
            Self::Summary { title } => (title, "summary"),
            Self::Text { title, .. } => (title, "notes"),
        };
        title.clone().unwrap_or_else(|| fallback.to_string())
    }

    fn build(&self, table: &QueryResult) -> Result<ReportPayload, ReportError> {
        match self {
            Self::Chart { chart, x, y, title } => {
                let points = chart_points(table, x, y)?;
                Ok(ReportPayload::Chart {
                    chart: ChartSpec {
                        kind: *chart,
                        title: title.clone(),
                        x: x.clone(),
                        y: y.clone(),
                        points,
                    },
                })
            }
            Self::Data { .. } => Ok(ReportPayload::Table {
                table: table.clone(),
            }),
            Self::Summary { .. } => Ok(ReportPayload::Table {
                table: describe(table),
            }),
            Self::Text { text, .. } => Ok(ReportPayload::Text { text: text.clone() }),
        }
    }
}

impl ReportProvider for ReportDefinition {
    fn create_report(&self, table: &QueryResult) -> Result<ReportPayload, ReportError> {
        let sections = self
            .sections
            .iter()
            .map(|section| {
                Ok(ReportSection {
                    title: section.title(),
                    payload: section.build(table)?,
                })
            })
            .collect::<Result<Vec<_>, ReportError>>()?;
        Ok(ReportPayload::Group { sections })
    }
}

fn chart_points(
    table: &QueryResult,
    x: &str,
    y: &str,
) -> Result<Vec<(Value, Value)>, ReportError> {
    let missing = |column: &str| ReportError::MissingColumn {
        column: column.to_string(),
    };
    let xs = table.column_values(x).ok_or_else(|| missing(x))?;
    let ys = table.column_values(y).ok_or_else(|| missing(y))?;
    Ok(xs.cloned().zip(ys.cloned()).collect())
}

pub fn load_report_definition(path: &Path) -> Result<ReportDefinition, ReportError> {
    let invalid = |message: String| ReportError::InvalidDefinition {
        path: path.display().to_string(),
        message,
    };
    let raw = std::fs::read_to_string(path).map_err(|error| invalid(error.to_string()))?;
    serde_json::from_str(&raw).map_err(|error| invalid(error.to_string()))
}

#[must_use]
pub fn report_definition_json_schema() -> Value {
    let schema = schemars::schema_for!(ReportDefinition);
    serde_json::to_value(schema).unwrap_or(Value::Null)
}
