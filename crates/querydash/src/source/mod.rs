use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod builtin;
pub mod connection;
pub mod definition;
pub mod pattern;
pub mod sqlite;

pub use connection::{ConnectionFactory, SourceConnection};
pub use definition::{DefinedSource, PlaceholderDefinition, SourceDefinition};
pub use pattern::{PatternError, PlaceholderMatch, PlaceholderMatcher, PrefixMatcher, RegexMatcher};

use crate::config::RuntimePaths;

pub const DEFAULT_SOURCE: &str = "example";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionMode {
    /// Values are pasted into the SQL text. No escaping is performed.
    Inline,
    Bound,
}

impl SubstitutionMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Bound => "bound",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Connection,
    Placeholder,
    SubstitutionMode,
}

impl Hook {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Placeholder => "placeholder",
            Self::SubstitutionMode => "substitution_mode",
        }
    }
}

impl Display for Hook {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("source `{0}` is not registered")]
    NotFound(String),

    #[error("source `{source_id}` does not provide the `{hook}` hook")]
    MissingHook { source_id: String, hook: Hook },

    #[error("source `{source_id}` has an invalid placeholder: {error}")]
    InvalidPattern {
        source_id: String,
        #[source]
        error: PatternError,
    },

    #[error("source `{0}` is registered more than once")]
    Duplicate(String),

    #[error("failed to load source definitions from {path}: {message}")]
    Definitions { path: String, message: String },
}

/// The capability a registry entry exposes. Every hook is optional so that
/// incomplete definitions can be reported precisely at load time.
pub trait SourceProvider: Send + Sync {
    fn connection_factory(&self) -> Option<Arc<dyn ConnectionFactory>>;

    fn placeholder_matcher(&self) -> Result<Option<Arc<dyn PlaceholderMatcher>>, PatternError>;

    fn substitution_mode(&self) -> Option<SubstitutionMode>;

    fn queries_dir(&self) -> Option<PathBuf> {
        None
    }

    fn reports_dir(&self) -> Option<PathBuf> {
        None
    }
}

#[derive(Clone, Default)]
pub struct SourceRegistry {
    providers: BTreeMap<String, Arc<dyn SourceProvider>>,
}

impl SourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_runtime(paths: &RuntimePaths) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        builtin::register_builtin_sources(&mut registry, &paths.sources_root)?;

        if paths.sources_file.is_file() {
            let definitions = definition::load_definitions(&paths.sources_file)?;
            tracing::info!(
                path = %paths.sources_file.display(),
                sources = definitions.len(),
                "loaded source definitions"
            );
            registry.register_definitions(definitions, &paths.sources_root);
        }

        Ok(registry)
    }

    pub fn register(
        &mut self,
        source_id: impl Into<String>,
        provider: Arc<dyn SourceProvider>,
    ) -> Result<(), ConfigError> {
        let source_id = source_id.into();
        if self.providers.contains_key(&source_id) {
            return Err(ConfigError::Duplicate(source_id));
        }
        self.providers.insert(source_id, provider);
        Ok(())
    }

    /// Definitions replace built-in profiles of the same name.
    pub fn register_definitions(
        &mut self,
        definitions: BTreeMap<String, SourceDefinition>,
        sources_root: &Path,
    ) {
        for (source_id, definition) in definitions {
            let provider = DefinedSource::new(definition, sources_root);
            if self
                .providers
                .insert(source_id.clone(), Arc::new(provider))
                .is_some()
            {
                tracing::info!(source = %source_id, "source definition overrides built-in profile");
            }
        }
    }

    #[must_use]
    pub fn get(&self, source_id: &str) -> Option<Arc<dyn SourceProvider>> {
        self.providers.get(source_id).cloned()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    source: String,
    queries_dir: PathBuf,
    reports_dir: PathBuf,
    connection_factory: Arc<dyn ConnectionFactory>,
    placeholder_matcher: Arc<dyn PlaceholderMatcher>,
    substitution_mode: SubstitutionMode,
}

impl SourceConfig {
    /// Resolves `source_id` from the registry. Does not connect.
    pub fn load(
        registry: &SourceRegistry,
        source_id: &str,
        sources_root: &Path,
    ) -> Result<Self, ConfigError> {
        let provider = registry
            .get(source_id)
            .ok_or_else(|| ConfigError::NotFound(source_id.to_string()))?;
        let missing = |hook| ConfigError::MissingHook {
            source_id: source_id.to_string(),
            hook,
        };

        let connection_factory = provider
            .connection_factory()
            .ok_or_else(|| missing(Hook::Connection))?;
        let placeholder_matcher = provider
            .placeholder_matcher()
            .map_err(|error| ConfigError::InvalidPattern {
                source_id: source_id.to_string(),
                error,
            })?
            .ok_or_else(|| missing(Hook::Placeholder))?;
        let substitution_mode = provider
            .substitution_mode()
            .ok_or_else(|| missing(Hook::SubstitutionMode))?;

        let source_root = sources_root.join(source_id);
        let queries_dir = provider
            .queries_dir()
            .unwrap_or_else(|| source_root.join("queries"));
        let reports_dir = provider
            .reports_dir()
            .unwrap_or_else(|| source_root.join("reports"));

        if substitution_mode == SubstitutionMode::Inline {
            tracing::warn!(
                source = %source_id,
                "source uses inline substitution; parameter values are pasted into SQL unescaped"
            );
        }
        tracing::info!(
            source = %source_id,
            connection = %connection_factory.describe(),
            placeholder = %placeholder_matcher.describe(),
            mode = substitution_mode.as_str(),
            "source resolved"
        );

        Ok(Self {
            source: source_id.to_string(),
            queries_dir,
            reports_dir,
            connection_factory,
            placeholder_matcher,
            substitution_mode,
        })
    }

    #[must_use]
    pub fn new(
        source: impl Into<String>,
        queries_dir: impl Into<PathBuf>,
        reports_dir: impl Into<PathBuf>,
        connection_factory: Arc<dyn ConnectionFactory>,
        placeholder_matcher: Arc<dyn PlaceholderMatcher>,
        substitution_mode: SubstitutionMode,
    ) -> Self {
        Self {
            source: source.into(),
            queries_dir: queries_dir.into(),
            reports_dir: reports_dir.into(),
            connection_factory,
            placeholder_matcher,
            substitution_mode,
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn queries_dir(&self) -> &Path {
        &self.queries_dir
    }

    #[must_use]
    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    #[must_use]
    pub fn placeholder_matcher(&self) -> &dyn PlaceholderMatcher {
        self.placeholder_matcher.as_ref()
    }

    #[must_use]
    pub const fn substitution_mode(&self) -> SubstitutionMode {
        self.substitution_mode
    }

    #[must_use]
    pub fn connection_factory(&self) -> &dyn ConnectionFactory {
        self.connection_factory.as_ref()
    }

    pub fn get_connection(&self) -> anyhow::Result<Box<dyn SourceConnection>> {
        self.connection_factory.connect()
    }
}
