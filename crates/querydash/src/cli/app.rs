use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::commands::{
    catalog::CatalogArgs, report::ReportArgs, run::RunArgs, seed::SeedArgs, sources::SourcesArgs,
    sql::SqlArgs,
};
use crate::source::DEFAULT_SOURCE;

#[derive(Debug, Parser)]
#[command(
    name = "querydash",
    version,
    about = "Parameterized SQL queries and reports over pluggable sources"
)]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[arg(long, global = true, value_name = "PATH")]
    pub home_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub cwd: Option<PathBuf>,

    /// Directory holding one sub-directory per source.
    #[arg(long, global = true, value_name = "PATH")]
    pub sources_root: Option<PathBuf>,

    /// Source definitions file; defaults to `<sources-root>/sources.json`.
    #[arg(long, global = true, value_name = "PATH")]
    pub sources_file: Option<PathBuf>,

    #[arg(long, global = true, value_name = "ID", default_value = DEFAULT_SOURCE)]
    pub source: String,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List query templates and their parameters.
    Catalog(CatalogArgs),
    /// Run a catalog query.
    Run(RunArgs),
    /// Run ad-hoc SQL without parameter substitution.
    Sql(SqlArgs),
    /// Run a catalog query and build its report.
    Report(ReportArgs),
    /// List registered sources.
    Sources(SourcesArgs),
    /// Write the sample database used by the `example` source.
    Seed(SeedArgs),
}

impl Command {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Catalog(_) => "catalog",
            Self::Run(_) => "run",
            Self::Sql(_) => "sql",
            Self::Report(_) => "report",
            Self::Sources(_) => "sources",
            Self::Seed(_) => "seed",
        }
    }
}
