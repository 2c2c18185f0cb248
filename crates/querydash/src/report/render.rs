use serde_json::Value;

use super::{ChartSpec, ReportPayload};
use crate::models::QueryResult;

/// Flattens a payload for a terminal: group titles become headings, tables
/// are column-aligned and charts are summarized on one line.
#[must_use]
pub fn render_text(payload: &ReportPayload) -> String {
    let mut out = String::new();
    render_into(payload, 2, &mut out);
    out.trim_end().to_string()
}

fn render_into(payload: &ReportPayload, depth: usize, out: &mut String) {
    match payload {
        ReportPayload::Table { table } => out.push_str(&render_table(table)),
        ReportPayload::Chart { chart } => out.push_str(&render_chart(chart)),
        ReportPayload::Text { text } => out.push_str(text),
        ReportPayload::Scalar { value } => out.push_str(&cell(value)),
        ReportPayload::Group { sections } => {
            for section in sections {
                out.push_str(&"#".repeat(depth));
                out.push(' ');
                out.push_str(&section.title);
                out.push('\n');
                render_into(&section.payload, depth + 1, out);
                out.push('\n');
            }
        }
        ReportPayload::List { items } => {
            for item in items {
                render_into(item, depth, out);
                out.push('\n');
            }
        }
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
}

fn render_chart(chart: &ChartSpec) -> String {
    let title = chart
        .title
        .clone()
        .unwrap_or_else(|| format!("{} by {}", chart.y, chart.x));
    format!(
        "[{} chart] {title}: x={} y={} points={}",
        chart.kind.as_str(),
        chart.x,
        chart.y,
        chart.points.len()
    )
}

#[must_use]
pub fn render_table(table: &QueryResult) -> String {
    if table.columns.is_empty() {
        return "(no columns)".to_string();
    }

    let cells = table
        .rows
        .iter()
        .map(|row| {
            (0..table.columns.len())
                .map(|index| row.get(index).map_or_else(String::new, cell))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let widths = table
        .columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            cells
                .iter()
                .map(|row| row[index].chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect::<Vec<_>>();

    let mut lines = Vec::with_capacity(cells.len() + 2);
    lines.push(join_padded(table.columns.iter().map(String::as_str), &widths));
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in &cells {
        lines.push(join_padded(row.iter().map(String::as_str), &widths));
    }
    if cells.is_empty() {
        lines.push("(0 rows)".to_string());
    }

    lines.join("\n")
}

fn join_padded<'a>(values: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    values
        .zip(widths)
        .map(|(value, &width)| format!("{value:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{render_table, render_text};
    use crate::models::QueryResult;
    use crate::report::{ChartKind, ChartSpec, ReportPayload, ReportSection};

    #[test]
    fn aligns_table_columns() {
        let table = QueryResult::new(
            vec!["ticker".to_string(), "price".to_string()],
            vec![
                vec![json!("AAPL"), json!(150.5)],
                vec![json!("GOOGL"), json!(null)],
            ],
        );
        assert_eq!(
            render_table(&table),
            "ticker  price\n------  -----\nAAPL    150.5\nGOOGL"
        );
    }

    #[test]
    fn groups_become_headings() {
        let payload = ReportPayload::Group {
            sections: vec![
                ReportSection {
                    title: "figure".to_string(),
                    payload: ReportPayload::Chart {
                        chart: ChartSpec {
                            kind: ChartKind::Line,
                            title: Some("Stock Prices".to_string()),
                            x: "date".to_string(),
                            y: "price".to_string(),
                            points: vec![(json!("2024-01-01"), json!(150.0))],
                        },
                    },
                },
                ReportSection {
                    title: "notes".to_string(),
                    payload: ReportPayload::text("Closing prices."),
                },
            ],
        };

        assert_eq!(
            render_text(&payload),
            "## figure\n[line chart] Stock Prices: x=date y=price points=1\n\n## notes\nClosing prices."
        );
    }
}
