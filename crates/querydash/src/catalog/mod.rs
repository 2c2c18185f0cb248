use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::source::PlaceholderMatcher;

pub const QUERY_FILE_EXTENSION: &str = ".sql";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    Date,
    Text,
}

impl ParamType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Text => "text",
        }
    }
}

#[must_use]
pub fn infer_param_type(name: &str) -> ParamType {
    if name.to_lowercase().contains("date") {
        ParamType::Date
    } else {
        ParamType::Text
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,

    #[serde(rename = "type")]
    pub param_type: ParamType,
}

impl ParameterSpec {
    #[must_use]
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        let param_type = infer_param_type(&name);
        Self { name, param_type }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTemplate {
    #[serde(skip)]
    pub name: String,
    pub template: String,
    pub params: Vec<ParameterSpec>,
}

impl QueryTemplate {
    #[must_use]
    pub fn parse(
        name: impl Into<String>,
        template: impl Into<String>,
        matcher: &dyn PlaceholderMatcher,
    ) -> Self {
        let template = template.into();
        let params = extract_parameters(&template, matcher);
        Self {
            name: name.into(),
            template,
            params,
        }
    }
}

/// Unique parameters in first-occurrence order. The text is not modified and
/// may keep repeating a placeholder.
#[must_use]
pub fn extract_parameters(text: &str, matcher: &dyn PlaceholderMatcher) -> Vec<ParameterSpec> {
    let mut seen = HashSet::new();
    matcher
        .find_all(text)
        .into_iter()
        .filter(|found| seen.insert(found.name.clone()))
        .map(|found| ParameterSpec::from_name(found.name))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogLoadError {
    #[error("failed to read query directory {path}: {message}")]
    Directory { path: String, message: String },

    #[error("{file} not loaded due to error: {message}")]
    File { file: String, message: String },
}

impl CatalogLoadError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Directory { .. } => "catalog_directory_unreadable",
            Self::File { .. } => "catalog_file_skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLoad {
    pub catalog: QueryCatalog,
    pub diagnostics: Vec<CatalogLoadError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueryCatalog {
    templates: BTreeMap<String, QueryTemplate>,
}

impl QueryCatalog {
    #[must_use]
    pub fn load(directory: &Path, matcher: &dyn PlaceholderMatcher) -> CatalogLoad {
        let mut catalog = Self::default();
        let mut diagnostics = Vec::new();

        let entries = match std::fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(
                    directory = %directory.display(),
                    error = %error,
                    "query directory unreadable; catalog is empty"
                );
                diagnostics.push(CatalogLoadError::Directory {
                    path: directory.display().to_string(),
                    message: error.to_string(),
                });
                return CatalogLoad {
                    catalog,
                    diagnostics,
                };
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    diagnostics.push(skipped("<unreadable entry>", &error));
                    continue;
                }
            };

            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                let lossy = file_name.to_string_lossy();
                if lossy.ends_with(QUERY_FILE_EXTENSION) {
                    diagnostics.push(skipped(&lossy, &"file name is not valid UTF-8"));
                }
                continue;
            };
            if !file_name.ends_with(QUERY_FILE_EXTENSION) {
                continue;
            }

            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            match std::fs::read_to_string(&path) {
                Ok(text) => catalog.insert(QueryTemplate::parse(file_name, text, matcher)),
                Err(error) => diagnostics.push(skipped(file_name, &error)),
            }
        }

        tracing::debug!(
            directory = %directory.display(),
            templates = catalog.len(),
            skipped = diagnostics.len(),
            "query catalog loaded"
        );

        CatalogLoad {
            catalog,
            diagnostics,
        }
    }

    #[must_use]
    pub fn from_templates(templates: impl IntoIterator<Item = QueryTemplate>) -> Self {
        let mut catalog = Self::default();
        for template in templates {
            catalog.insert(template);
        }
        catalog
    }

    fn insert(&mut self, template: QueryTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&QueryTemplate> {
        self.templates.get(name)
    }

    #[must_use]
    pub fn get_params(&self, name: &str) -> &[ParameterSpec] {
        self.templates
            .get(name)
            .map_or(&[], |template| template.params.as_slice())
    }

    /// Largest parameter count across templates, 0 when empty. Sizes the
    /// fixed set of input slots a form renders.
    #[must_use]
    pub fn max_params(&self) -> usize {
        self.templates
            .values()
            .map(|template| template.params.len())
            .max()
            .unwrap_or(0)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryTemplate> {
        self.templates.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn skipped(file: &str, error: &dyn std::fmt::Display) -> CatalogLoadError {
    tracing::warn!(file = %file, error = %error, "query file skipped");
    CatalogLoadError::File {
        file: file.to_string(),
        message: error.to_string(),
    }
}
