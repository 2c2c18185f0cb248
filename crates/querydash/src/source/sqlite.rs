use std::path::{Path, PathBuf};

use anyhow::{Context, Error, Result, bail};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, params_from_iter};
use serde_json::{Value, json};

use super::connection::{ConnectionFactory, SourceConnection};
use crate::models::QueryResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConnectionFactory {
    database: PathBuf,
    read_only: bool,
}

impl SqliteConnectionFactory {
    #[must_use]
    pub fn new(database: impl Into<PathBuf>, read_only: bool) -> Self {
        Self {
            database: database.into(),
            read_only,
        }
    }

    #[must_use]
    pub fn database(&self) -> &Path {
        &self.database
    }

    #[must_use]
    pub const fn read_only(&self) -> bool {
        self.read_only
    }
}

impl ConnectionFactory for SqliteConnectionFactory {
    fn connect(&self) -> Result<Box<dyn SourceConnection>> {
        // Without SQLITE_OPEN_CREATE a missing file fails here instead of
        // silently yielding an empty database.
        if !self.database.is_file() {
            bail!("sqlite database not found: {}", self.database.display());
        }

        let access = if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        let flags = access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        tracing::debug!(
            database = %self.database.display(),
            read_only = self.read_only,
            "opening sqlite connection"
        );
        let connection = Connection::open_with_flags(&self.database, flags).with_context(|| {
            format!("failed to open sqlite database {}", self.database.display())
        })?;

        Ok(Box::new(SqliteConnection { connection }))
    }

    fn describe(&self) -> String {
        let mode = if self.read_only { "ro" } else { "rw" };
        format!("sqlite:{} ({mode})", self.database.display())
    }
}

#[derive(Debug)]
pub struct SqliteConnection {
    connection: Connection,
}

impl SourceConnection for SqliteConnection {
    fn query(&mut self, sql: &str, params: &[String]) -> Result<QueryResult> {
        let mut statement = self
            .connection
            .prepare(sql)
            .map_err(|error| Error::new(error).context("failed to prepare query"))?;
        let columns = statement
            .column_names()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        let mut rows = statement
            .query(params_from_iter(params.iter()))
            .map_err(|error| Error::new(error).context("failed to execute query"))?;
        let mut result_rows = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|error| Error::new(error).context("failed to fetch query row"))?
        {
            let mut record = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                let value = row
                    .get::<usize, SqlValue>(index)
                    .map_err(|error| Error::new(error).context("failed to decode query column"))?;
                record.push(json_value_from_sql(value));
            }
            result_rows.push(record);
        }

        Ok(QueryResult::new(columns, result_rows))
    }

    fn close(self: Box<Self>) -> Result<()> {
        tracing::debug!("closing sqlite connection");
        self.connection
            .close()
            .map_err(|(_, error)| Error::new(error).context("failed to close sqlite connection"))
    }
}

fn json_value_from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(value) => json!(value),
        SqlValue::Real(value) => json!(value),
        SqlValue::Text(value) => json!(value),
        SqlValue::Blob(value) => json!(encode_blob_hex(&value)),
    }
}

fn encode_blob_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push(HEX[(byte >> 4) as usize] as char);
        output.push(HEX[(byte & 0x0f) as usize] as char);
    }
    output
}
