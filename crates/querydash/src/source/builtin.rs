use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::pattern::{PatternError, PlaceholderMatcher, RegexMatcher};
use super::sqlite::SqliteConnectionFactory;
use super::{ConfigError, ConnectionFactory, SourceProvider, SourceRegistry, SubstitutionMode};

pub const EXAMPLE_SOURCE: &str = "example";
pub const EXAMPLE_DATABASE_FILE: &str = "sample_data.db";
pub const EXAMPLE_PLACEHOLDER_PATTERN: &str = r"'(\w+)'";

/// The demo profile: the seeded SQLite file under `<sources_root>/example`,
/// quoted-name placeholders and inline substitution.
#[derive(Debug, Clone)]
pub struct ExampleSource {
    database: PathBuf,
}

impl ExampleSource {
    #[must_use]
    pub fn new(sources_root: &Path) -> Self {
        Self {
            database: example_database_path(sources_root),
        }
    }
}

impl SourceProvider for ExampleSource {
    fn connection_factory(&self) -> Option<Arc<dyn ConnectionFactory>> {
        let factory: Arc<dyn ConnectionFactory> =
            Arc::new(SqliteConnectionFactory::new(self.database.clone(), true));
        Some(factory)
    }

    fn placeholder_matcher(&self) -> Result<Option<Arc<dyn PlaceholderMatcher>>, PatternError> {
        let matcher: Arc<dyn PlaceholderMatcher> =
            Arc::new(RegexMatcher::new(EXAMPLE_PLACEHOLDER_PATTERN)?);
        Ok(Some(matcher))
    }

    fn substitution_mode(&self) -> Option<SubstitutionMode> {
        Some(SubstitutionMode::Inline)
    }
}

#[must_use]
pub fn example_database_path(sources_root: &Path) -> PathBuf {
    sources_root.join(EXAMPLE_SOURCE).join(EXAMPLE_DATABASE_FILE)
}

pub fn register_builtin_sources(
    registry: &mut SourceRegistry,
    sources_root: &Path,
) -> Result<(), ConfigError> {
    registry.register(EXAMPLE_SOURCE, Arc::new(ExampleSource::new(sources_root)))
}
