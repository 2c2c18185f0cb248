use std::collections::HashMap;

use serde_json::{Number, Value, json};

use crate::models::QueryResult;

pub const STATISTIC_COLUMN: &str = "statistic";

const NUMERIC_STATISTICS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
const CATEGORICAL_STATISTICS: [&str; 4] = ["count", "unique", "top", "freq"];

/// Same rows as `pandas.DataFrame.describe()` with default arguments.
#[must_use]
pub fn describe(table: &QueryResult) -> QueryResult {
    let numeric = (0..table.columns.len())
        .filter_map(|index| numeric_column(table, index).map(|values| (index, values)))
        .collect::<Vec<_>>();

    if numeric.is_empty() {
        describe_categorical(table)
    } else {
        describe_numeric(table, &numeric)
    }
}

fn describe_numeric(table: &QueryResult, columns: &[(usize, Vec<f64>)]) -> QueryResult {
    let mut header = vec![STATISTIC_COLUMN.to_string()];
    header.extend(columns.iter().map(|(index, _)| table.columns[*index].clone()));

    let stats = columns
        .iter()
        .map(|(_, values)| NumericStats::compute(values))
        .collect::<Vec<_>>();

    let rows = NUMERIC_STATISTICS
        .iter()
        .enumerate()
        .map(|(position, label)| {
            let mut row = vec![json!(label)];
            row.extend(stats.iter().map(|stats| stats.cell(position)));
            row
        })
        .collect();

    QueryResult::new(header, rows)
}

fn describe_categorical(table: &QueryResult) -> QueryResult {
    let mut header = vec![STATISTIC_COLUMN.to_string()];
    header.extend(table.columns.iter().cloned());

    let stats = (0..table.columns.len())
        .map(|index| CategoricalStats::compute(table, index))
        .collect::<Vec<_>>();

    let rows = CATEGORICAL_STATISTICS
        .iter()
        .enumerate()
        .map(|(position, label)| {
            let mut row = vec![json!(label)];
            row.extend(stats.iter().map(|stats| stats.cell(position)));
            row
        })
        .collect();

    QueryResult::new(header, rows)
}

fn numeric_column(table: &QueryResult, index: usize) -> Option<Vec<f64>> {
    let mut values = Vec::new();
    for row in &table.rows {
        match row.get(index) {
            None | Some(Value::Null) => {}
            Some(Value::Number(number)) => values.push(number.as_f64()?),
            Some(_) => return None,
        }
    }
    (!values.is_empty()).then_some(values)
}

#[derive(Debug, Clone, PartialEq)]
struct NumericStats {
    count: usize,
    mean: f64,
    std: Option<f64>,
    min: f64,
    q1: f64,
    median: f64,
    q3: f64,
    max: f64,
}

impl NumericStats {
    fn compute(values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std = (count > 1).then(|| {
            let squares = sorted.iter().map(|value| (value - mean).powi(2)).sum::<f64>();
            (squares / (count - 1) as f64).sqrt()
        });

        Self {
            count,
            mean,
            std,
            min: sorted[0],
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
            max: sorted[count - 1],
        }
    }

    fn cell(&self, position: usize) -> Value {
        match position {
            0 => json!(self.count),
            1 => float(self.mean),
            2 => self.std.map_or(Value::Null, float),
            3 => float(self.min),
            4 => float(self.q1),
            5 => float(self.median),
            6 => float(self.q3),
            _ => float(self.max),
        }
    }
}

/// Linear interpolation between closest ranks, `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

fn float(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

#[derive(Debug, Clone, PartialEq)]
struct CategoricalStats {
    count: usize,
    unique: usize,
    top: Value,
    freq: usize,
}

impl CategoricalStats {
    fn compute(table: &QueryResult, index: usize) -> Self {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        let mut first_seen = Vec::new();

        for row in &table.rows {
            let Some(value) = row.get(index).filter(|value| !value.is_null()) else {
                continue;
            };
            let key = category_key(value);
            let order = counts.len();
            let entry = counts.entry(key).or_insert_with(|| {
                first_seen.push(value.clone());
                (0, order)
            });
            entry.0 += 1;
        }

        let count = counts.values().map(|(hits, _)| hits).sum();
        // Ties go to the value seen first.
        let top = counts
            .values()
            .max_by(|left, right| left.0.cmp(&right.0).then(right.1.cmp(&left.1)))
            .copied();

        Self {
            count,
            unique: counts.len(),
            top: top.map_or(Value::Null, |(_, order)| first_seen[order].clone()),
            freq: top.map_or(0, |(hits, _)| hits),
        }
    }

    fn cell(&self, position: usize) -> Value {
        match position {
            0 => json!(self.count),
            1 => json!(self.unique),
            2 => self.top.clone(),
            _ if self.count == 0 => Value::Null,
            _ => json!(self.freq),
        }
    }
}

fn category_key(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::describe;
    use crate::models::QueryResult;

    fn column(table: &QueryResult, name: &str) -> Vec<Value> {
        table
            .column_values(name)
            .expect("column should exist")
            .cloned()
            .collect()
    }

    #[test]
    fn numeric_columns_match_pandas_describe() {
        let table = QueryResult::new(
            vec!["ticker".to_string(), "price".to_string()],
            vec![
                vec![json!("AAPL"), json!(1)],
                vec![json!("AAPL"), json!(2)],
                vec![json!("MSFT"), json!(3)],
                vec![json!("MSFT"), json!(4)],
                vec![json!("TSLA"), Value::Null],
            ],
        );
        let summary = describe(&table);

        assert_eq!(summary.columns, vec!["statistic", "price"]);
        assert_eq!(
            column(&summary, "statistic"),
            vec![
                json!("count"),
                json!("mean"),
                json!("std"),
                json!("min"),
                json!("25%"),
                json!("50%"),
                json!("75%"),
                json!("max"),
            ]
        );

        let price = column(&summary, "price");
        assert_eq!(price[0], json!(4));
        assert_eq!(price[1], json!(2.5));
        let std = price[2].as_f64().expect("std is numeric");
        assert!((std - 1.290_994_448_735_805_6).abs() < 1e-12);
        assert_eq!(price[3], json!(1.0));
        assert_eq!(price[4], json!(1.75));
        assert_eq!(price[5], json!(2.5));
        assert_eq!(price[6], json!(3.25));
        assert_eq!(price[7], json!(4.0));
    }

    #[test]
    fn single_value_has_null_std() {
        let table = QueryResult::new(vec!["n".to_string()], vec![vec![json!(7)]]);
        let summary = describe(&table);
        assert_eq!(column(&summary, "n")[2], Value::Null);
    }

    #[test]
    fn text_only_tables_get_categorical_statistics() {
        let table = QueryResult::new(
            vec!["ticker".to_string()],
            vec![
                vec![json!("MSFT")],
                vec![json!("AAPL")],
                vec![json!("AAPL")],
                vec![json!("MSFT")],
                vec![json!("TSLA")],
            ],
        );
        let summary = describe(&table);

        assert_eq!(
            column(&summary, "statistic"),
            vec![json!("count"), json!("unique"), json!("top"), json!("freq")]
        );
        assert_eq!(
            column(&summary, "ticker"),
            vec![json!(5), json!(3), json!("MSFT"), json!(2)]
        );
    }
}
