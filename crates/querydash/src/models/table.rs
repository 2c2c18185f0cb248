use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tabular query output: ordered column names and rows of JSON scalars.
///
/// A table with zero rows (or zero columns) is a valid result. Failures are
/// reported through the caller's error channel, never as an empty table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn column_values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Value>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row.get(index).unwrap_or(&Value::Null)))
    }

    #[must_use]
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = Map::new();
                for (index, column) in self.columns.iter().enumerate() {
                    let value = row.get(index).cloned().unwrap_or(Value::Null);
                    record.insert(column.clone(), value);
                }
                Value::Object(record)
            })
            .collect()
    }
}
