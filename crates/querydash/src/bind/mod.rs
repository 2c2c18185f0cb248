use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use time::Date;
use time::macros::format_description;

use crate::catalog::{ParamType, ParameterSpec, QueryTemplate};
use crate::source::SubstitutionMode;

pub type ParamValues = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundQuery {
    pub sql: String,
    pub params: Vec<String>,
}

impl BoundQuery {
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.sql.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("no value supplied for parameter `{0}`")]
    MissingValue(String),

    #[error("parameter `{name}` expects a YYYY-MM-DD date, got `{value}`")]
    InvalidDate { name: String, value: String },
}

impl BindError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingValue(_) => "bind_missing_value",
            Self::InvalidDate { .. } => "bind_invalid_date",
        }
    }
}

/// Inline mode pastes values into the text without escaping.
pub fn bind_template(
    template: &QueryTemplate,
    values: &ParamValues,
    mode: SubstitutionMode,
) -> Result<BoundQuery, BindError> {
    let mut resolved = Vec::with_capacity(template.params.len());
    for param in &template.params {
        let value = values
            .get(&param.name)
            .ok_or_else(|| BindError::MissingValue(param.name.clone()))?;
        resolved.push((param.name.as_str(), value.as_str()));
    }

    match mode {
        SubstitutionMode::Inline => {
            let sql = resolved
                .iter()
                .fold(template.template.clone(), |sql, (name, value)| {
                    sql.replace(&format!("'{name}'"), &format!("'{value}'"))
                });
            Ok(BoundQuery {
                sql,
                params: Vec::new(),
            })
        }
        SubstitutionMode::Bound => Ok(BoundQuery {
            sql: template.template.clone(),
            params: resolved
                .into_iter()
                .map(|(_, value)| value.to_string())
                .collect(),
        }),
    }
}

/// Ad-hoc SQL is self-contained: no substitution whatever the source mode.
#[must_use]
pub fn bind_literal(sql: impl Into<String>) -> BoundQuery {
    BoundQuery {
        sql: sql.into(),
        params: Vec::new(),
    }
}

/// One form input slot. Each slot carries both a text and a date value; the
/// parameter type picks which one is read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSlot {
    pub text: Option<String>,
    pub date: Option<String>,
}

impl InputSlot {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            text: Some(value.into()),
            date: None,
        }
    }

    #[must_use]
    pub fn date(value: impl Into<String>) -> Self {
        Self {
            text: None,
            date: Some(value.into()),
        }
    }
}

/// Zips slot `i` with parameter `i`. Blank inputs are left out of the
/// mapping so binding later reports them as missing.
pub fn values_from_slots(
    params: &[ParameterSpec],
    slots: &[InputSlot],
) -> Result<ParamValues, BindError> {
    let mut values = ParamValues::new();

    for (param, slot) in params.iter().zip(slots) {
        let raw = match param.param_type {
            ParamType::Date => slot.date.as_deref(),
            ParamType::Text => slot.text.as_deref(),
        };
        let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
            continue;
        };

        if param.param_type == ParamType::Date {
            validate_date(&param.name, value)?;
        }
        values.insert(param.name.clone(), value.to_string());
    }

    Ok(values)
}

fn validate_date(name: &str, value: &str) -> Result<(), BindError> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map(|_| ())
        .map_err(|_| BindError::InvalidDate {
            name: name.to_string(),
            value: value.to_string(),
        })
}
