use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::pattern::{PatternError, PlaceholderMatcher, PrefixMatcher, RegexMatcher};
use super::sqlite::SqliteConnectionFactory;
use super::{ConfigError, ConnectionFactory, SourceProvider, SubstitutionMode};

pub type SourceDefinitions = BTreeMap<String, SourceDefinition>;

/// One source as declared in `sources.json`.
///
/// The three hooks are optional at the file level; a missing one is reported
/// when the source is loaded, not when the file is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SourceDefinition {
    /// SQLite database file, relative paths resolve against the sources root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<PlaceholderDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitution_mode: Option<SubstitutionMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queries_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reports_dir: Option<PathBuf>,

    #[serde(default = "default_read_only")]
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderDefinition {
    /// Regex whose `name` group (or first group) captures the parameter name.
    Regex(String),
    /// Single-character prefix: `:`, `@` or `$`.
    Prefix(char),
}

impl PlaceholderDefinition {
    pub fn build(&self) -> Result<Arc<dyn PlaceholderMatcher>, PatternError> {
        let matcher: Arc<dyn PlaceholderMatcher> = match self {
            Self::Regex(pattern) => Arc::new(RegexMatcher::new(pattern)?),
            Self::Prefix(prefix) => Arc::new(PrefixMatcher::new(*prefix)?),
        };
        Ok(matcher)
    }
}

const fn default_read_only() -> bool {
    true
}

pub fn load_definitions(path: &Path) -> Result<SourceDefinitions, ConfigError> {
    let failure = |message: String| ConfigError::Definitions {
        path: path.display().to_string(),
        message,
    };
    let raw = std::fs::read_to_string(path).map_err(|error| failure(error.to_string()))?;
    serde_json::from_str(&raw).map_err(|error| failure(error.to_string()))
}

#[must_use]
pub fn definitions_json_schema() -> Value {
    let schema = schemars::schema_for!(SourceDefinitions);
    serde_json::to_value(schema).unwrap_or(Value::Null)
}

#[derive(Debug, Clone)]
pub struct DefinedSource {
    definition: SourceDefinition,
    sources_root: PathBuf,
}

impl DefinedSource {
    #[must_use]
    pub fn new(definition: SourceDefinition, sources_root: &Path) -> Self {
        Self {
            definition,
            sources_root: sources_root.to_path_buf(),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.sources_root.join(path)
        }
    }
}

impl SourceProvider for DefinedSource {
    fn connection_factory(&self) -> Option<Arc<dyn ConnectionFactory>> {
        let database = self.definition.database.as_deref()?;
        let factory: Arc<dyn ConnectionFactory> = Arc::new(SqliteConnectionFactory::new(
            self.resolve(database),
            self.definition.read_only,
        ));
        Some(factory)
    }

    fn placeholder_matcher(&self) -> Result<Option<Arc<dyn PlaceholderMatcher>>, PatternError> {
        self.definition
            .placeholder
            .as_ref()
            .map(PlaceholderDefinition::build)
            .transpose()
    }

    fn substitution_mode(&self) -> Option<SubstitutionMode> {
        self.definition.substitution_mode
    }

    fn queries_dir(&self) -> Option<PathBuf> {
        self.definition
            .queries_dir
            .as_deref()
            .map(|path| self.resolve(path))
    }

    fn reports_dir(&self) -> Option<PathBuf> {
        self.definition
            .reports_dir
            .as_deref()
            .map(|path| self.resolve(path))
    }
}
