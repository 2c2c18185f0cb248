use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use querydash::models::QueryResult;
use querydash::report::{
    ChartKind, NO_DATA_MESSAGE, ReportError, ReportPayload, ReportProvider, ReportRegistry,
    render_text,
};
use serde_json::json;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}-{nanos}"))
}

fn prices() -> QueryResult {
    QueryResult::new(
        vec!["date".to_string(), "price".to_string()],
        vec![
            vec![json!("2024-01-01"), json!(150.0)],
            vec![json!("2024-01-02"), json!(150.5)],
            vec![json!("2024-01-03"), json!(151.0)],
        ],
    )
}

const STOCK_PRICES_REPORT: &str = r#"{
  "sections": [
    {"type": "chart", "chart": "line", "x": "date", "y": "price", "title": "Stock Prices"},
    {"type": "data"}
  ]
}"#;

#[test]
fn declarative_definitions_are_keyed_by_query_stem() {
    let dir = unique_temp_dir("querydash-reports-load");
    std::fs::create_dir_all(&dir).expect("reports dir should be creatable");
    std::fs::write(dir.join("stock_prices.json"), STOCK_PRICES_REPORT)
        .expect("report definition should be writable");
    std::fs::write(dir.join("notes.txt"), "ignored").expect("note should be writable");

    let registry = ReportRegistry::load_dir(&dir);

    assert!(registry.diagnostics().is_empty());
    assert_eq!(registry.names().collect::<Vec<_>>(), vec!["stock_prices"]);

    let payload = registry.build_report("stock_prices.sql", &prices());
    let ReportPayload::Group { sections } = payload else {
        panic!("declarative report should produce a group");
    };
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].title, "Stock Prices");
    assert_eq!(sections[1].title, "data");
    match &sections[0].payload {
        ReportPayload::Chart { chart } => {
            assert_eq!(chart.kind, ChartKind::Line);
            assert_eq!(chart.title.as_deref(), Some("Stock Prices"));
            assert_eq!(chart.points.len(), 3);
            assert_eq!(chart.points[2], (json!("2024-01-03"), json!(151.0)));
        }
        other => panic!("expected chart section, got {other:?}"),
    }
    assert_eq!(
        sections[1].payload,
        ReportPayload::Table { table: prices() }
    );
}

#[test]
fn malformed_definition_is_reported_and_dispatch_falls_back() {
    let dir = unique_temp_dir("querydash-reports-malformed");
    std::fs::create_dir_all(&dir).expect("reports dir should be creatable");
    std::fs::write(dir.join("stock_prices.json"), "{\"sections\": [{\"type\": \"pie\"}]}")
        .expect("report definition should be writable");

    let registry = ReportRegistry::load_dir(&dir);

    assert_eq!(registry.diagnostics().len(), 1);
    assert!(matches!(
        registry.diagnostics()[0],
        ReportError::InvalidDefinition { .. }
    ));
    assert!(registry.get("stock_prices.sql").is_none());
    assert!(matches!(
        registry.build_report("stock_prices.sql", &prices()),
        ReportPayload::Table { .. }
    ));
}

#[test]
fn missing_reports_directory_is_an_empty_registry() {
    let registry = ReportRegistry::load_dir(&unique_temp_dir("querydash-reports-missing"));

    assert_eq!(registry.names().count(), 0);
    assert!(registry.diagnostics().is_empty());
}

#[test]
fn chart_over_a_missing_column_becomes_an_error_message() {
    let dir = unique_temp_dir("querydash-reports-column");
    std::fs::create_dir_all(&dir).expect("reports dir should be creatable");
    std::fs::write(
        dir.join("prices.json"),
        r#"{"sections": [{"type": "chart", "chart": "bar", "x": "date", "y": "volume"}]}"#,
    )
    .expect("report definition should be writable");

    let payload = ReportRegistry::load_dir(&dir).build_report("prices.sql", &prices());

    assert_eq!(
        payload.as_text(),
        Some("Error generating report: column `volume` is not in the result")
    );
}

#[test]
fn code_providers_override_and_empty_results_short_circuit() {
    let mut registry = ReportRegistry::new();
    let latest: Arc<dyn ReportProvider> =
        Arc::new(|table: &QueryResult| -> Result<ReportPayload, ReportError> {
            let last = table.rows.last().and_then(|row| row.get(1)).cloned();
            Ok(ReportPayload::Scalar {
                value: last.unwrap_or_default(),
            })
        });
    registry.register("stock_prices", latest);

    assert_eq!(
        registry.build_report("stock_prices.sql", &prices()),
        ReportPayload::Scalar {
            value: json!(151.0)
        }
    );

    let empty = QueryResult::new(vec!["date".to_string(), "price".to_string()], Vec::new());
    let payload = registry.build_report("stock_prices.sql", &empty);
    assert_eq!(payload.as_text(), Some(NO_DATA_MESSAGE));
    assert_eq!(render_text(&payload), NO_DATA_MESSAGE);
}

#[cfg(target_os = "linux")]
#[test]
fn non_utf8_definition_names_are_reported() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = unique_temp_dir("querydash-reports-non-utf8");
    std::fs::create_dir_all(&dir).expect("reports dir should be creatable");
    std::fs::write(dir.join("stock_prices.json"), STOCK_PRICES_REPORT)
        .expect("report definition should be writable");
    std::fs::write(dir.join(OsStr::from_bytes(b"bad\xff.json")), STOCK_PRICES_REPORT)
        .expect("definition with raw name should be writable");

    let registry = ReportRegistry::load_dir(&dir);

    assert_eq!(registry.names().collect::<Vec<_>>(), vec!["stock_prices"]);
    assert_eq!(registry.diagnostics().len(), 1);
    assert!(matches!(
        &registry.diagnostics()[0],
        ReportError::InvalidDefinition { message, .. } if message.contains("not valid UTF-8")
    ));
}
