#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use querydash::cli::app::{Cli, Command, RuntimeArgs};
use querydash::cli::commands;
use querydash::config::RuntimePaths;
use querydash::models::QueryEnvelopeCommandFailure;
use querydash::source::ConfigError;
use tracing_subscriber::EnvFilter;

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_CONFIG_FAILURE: i32 = 2;
const EXIT_USAGE_ERROR: i32 = 64;

const LOG_ENV: &str = "QUERYDASH_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return exit_code_for_parse_error(error),
    };
    init_tracing();

    let command_name = cli.command.name();
    println!("querydash: starting `{command_name}`");

    match execute(cli) {
        Ok(()) => {
            println!("querydash: completed `{command_name}` (exit_code={EXIT_SUCCESS})");
            EXIT_SUCCESS
        }
        Err(error) => {
            let exit_code = classify_runtime_error(&error);
            if let Some(failure) = error.downcast_ref::<QueryEnvelopeCommandFailure>() {
                println!("{failure}");
            } else {
                eprintln!("{error:#}");
            }
            eprintln!("querydash: failed `{command_name}` (exit_code={exit_code})");
            exit_code
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn execute(cli: Cli) -> Result<()> {
    let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
    let source_id = cli.runtime.source.as_str();

    match &cli.command {
        Command::Catalog(args) => commands::catalog::run(args, &runtime_paths, source_id),
        Command::Run(args) => commands::run::run(args, &runtime_paths, source_id),
        Command::Sql(args) => commands::sql::run(args, &runtime_paths, source_id),
        Command::Report(args) => commands::report::run(args, &runtime_paths, source_id),
        Command::Sources(args) => commands::sources::run(args, &runtime_paths),
        Command::Seed(args) => commands::seed::run(args, &runtime_paths),
    }
}

fn classify_runtime_error(error: &anyhow::Error) -> i32 {
    if error.downcast_ref::<ConfigError>().is_some() {
        EXIT_CONFIG_FAILURE
    } else {
        EXIT_RUNTIME_FAILURE
    }
}

fn exit_code_for_parse_error(error: clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = error.print();
            EXIT_SUCCESS
        }
        _ => {
            let _ = error.print();
            EXIT_USAGE_ERROR
        }
    }
}

fn resolve_runtime_paths(args: &RuntimeArgs) -> Result<RuntimePaths> {
    let home_dir = args
        .home_dir
        .clone()
        .or_else(|| std::env::var_os("HOME").map(PathBuf::from));

    let cwd = match &args.cwd {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    querydash::config::resolve_runtime_paths(
        &cwd,
        home_dir.as_deref(),
        args.sources_root.as_deref(),
        args.sources_file.as_deref(),
    )
}
