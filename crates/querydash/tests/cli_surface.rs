use std::path::Path;

use clap::Parser;
use querydash::cli::app::{Cli, Command};

#[test]
fn parses_global_runtime_flags_for_run() {
    let cli = Cli::parse_from([
        "querydash",
        "--home-dir",
        "/home/tester",
        "--cwd",
        "/work/repo",
        "--sources-root",
        "~/dash/sources",
        "--source",
        "warehouse",
        "run",
        "stock_prices",
        "2024-01-01",
        "2024-01-31",
        "--param",
        "ticker=AAPL",
    ]);

    assert_eq!(
        cli.runtime.home_dir.as_deref(),
        Some(Path::new("/home/tester"))
    );
    assert_eq!(cli.runtime.cwd.as_deref(), Some(Path::new("/work/repo")));
    assert_eq!(
        cli.runtime.sources_root.as_deref(),
        Some(Path::new("~/dash/sources"))
    );
    assert!(cli.runtime.sources_file.is_none());
    assert_eq!(cli.runtime.source, "warehouse");

    match cli.command {
        Command::Run(args) => {
            assert_eq!(args.input.query, "stock_prices");
            assert_eq!(args.input.values, vec!["2024-01-01", "2024-01-31"]);
            assert_eq!(
                args.input.params,
                vec![("ticker".to_string(), "AAPL".to_string())]
            );
        }
        other => panic!("expected run command, got {other:?}"),
    }
}

#[test]
fn source_defaults_to_the_example_profile() {
    let cli = Cli::parse_from(["querydash", "catalog"]);

    assert_eq!(cli.runtime.source, "example");
    match cli.command {
        Command::Catalog(args) => assert!(!args.names),
        other => panic!("expected catalog command, got {other:?}"),
    }
}

#[test]
fn global_flags_are_accepted_after_the_subcommand() {
    let cli = Cli::parse_from(["querydash", "sql", "SELECT 1", "--source", "bound"]);

    assert_eq!(cli.runtime.source, "bound");
    match cli.command {
        Command::Sql(args) => assert_eq!(args.sql, "SELECT 1"),
        other => panic!("expected sql command, got {other:?}"),
    }
}

#[test]
fn parses_report_text_flag() {
    let cli = Cli::parse_from(["querydash", "report", "stock_prices.sql", "--text"]);

    match cli.command {
        Command::Report(args) => {
            assert!(args.text);
            assert_eq!(args.input.query, "stock_prices.sql");
            assert!(args.input.values.is_empty());
        }
        other => panic!("expected report command, got {other:?}"),
    }
}

#[test]
fn parses_seed_and_sources_flags() {
    let cli = Cli::parse_from(["querydash", "seed", "--database", "data/demo.db"]);
    match cli.command {
        Command::Seed(args) => {
            assert_eq!(args.database.as_deref(), Some(Path::new("data/demo.db")));
        }
        other => panic!("expected seed command, got {other:?}"),
    }

    let cli = Cli::parse_from(["querydash", "sources", "--schema"]);
    match cli.command {
        Command::Sources(args) => assert!(args.schema),
        other => panic!("expected sources command, got {other:?}"),
    }
}

#[test]
fn malformed_param_pair_is_a_usage_error() {
    let error = Cli::try_parse_from(["querydash", "run", "stock_prices", "--param", "ticker"])
        .expect_err("param without `=` should be rejected");

    assert_eq!(error.kind(), clap::error::ErrorKind::ValueValidation);
}
