use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, Transaction, params_from_iter};
use time::macros::{date, format_description};
use time::{Date, Duration};

pub const STOCK_PRICES_TABLE: &str = "stock_prices";
pub const COMPANY_FINANCIALS_TABLE: &str = "company_financials";
pub const MARKET_INDICES_TABLE: &str = "market_indices";

const TICKERS: [&str; 5] = ["AAPL", "GOOGL", "MSFT", "AMZN", "TSLA"];
const INDICES: [&str; 3] = ["S&P 500", "NASDAQ", "DOW JONES"];
const DAYS: usize = 365;
const FINANCIAL_ENTRIES: usize = 100;
const START_DATE: Date = date!(2024 - 01 - 01);

const SCHEMA_SQL: &str = r"
DROP TABLE IF EXISTS stock_prices;
DROP TABLE IF EXISTS company_financials;
DROP TABLE IF EXISTS market_indices;
CREATE TABLE stock_prices (date TEXT NOT NULL, ticker TEXT NOT NULL, price REAL NOT NULL);
CREATE TABLE company_financials (ticker TEXT NOT NULL, revenue REAL NOT NULL, profit REAL NOT NULL);
CREATE TABLE market_indices (index_name TEXT NOT NULL, value INTEGER NOT NULL, date TEXT NOT NULL);
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedStats {
    pub stock_prices: usize,
    pub company_financials: usize,
    pub market_indices: usize,
}

impl SeedStats {
    #[must_use]
    pub const fn total_rows(&self) -> usize {
        self.stock_prices + self.company_financials + self.market_indices
    }
}

pub fn write_sample_database(path: &Path) -> Result<SeedStats> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("failed to create sample database directory: {}", parent.display())
        })?;
    }

    let mut connection = Connection::open(path)
        .with_context(|| format!("failed to open sqlite database: {}", path.display()))?;
    let tx = connection
        .transaction()
        .context("failed to open sqlite transaction")?;
    tx.execute_batch(SCHEMA_SQL)
        .context("failed to create sample tables")?;

    let stats = SeedStats {
        stock_prices: insert_rows(&tx, STOCK_PRICES_TABLE, 3, stock_price_rows()?)?,
        company_financials: insert_rows(
            &tx,
            COMPANY_FINANCIALS_TABLE,
            3,
            company_financial_rows(),
        )?,
        market_indices: insert_rows(&tx, MARKET_INDICES_TABLE, 3, market_index_rows()?)?,
    };

    tx.commit()
        .context("failed to commit sample data transaction")?;
    tracing::debug!(
        database = %path.display(),
        rows = stats.total_rows(),
        "sample database written"
    );

    Ok(stats)
}

fn insert_rows(
    tx: &Transaction<'_>,
    table: &str,
    width: usize,
    rows: Vec<Vec<SqlValue>>,
) -> Result<usize> {
    let placeholders = (1..=width)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut statement = tx
        .prepare_cached(&format!("INSERT INTO {table} VALUES ({placeholders})"))
        .with_context(|| format!("failed to prepare insert into {table}"))?;

    for row in &rows {
        statement
            .execute(params_from_iter(row.iter()))
            .with_context(|| format!("failed to insert into {table}"))?;
    }

    Ok(rows.len())
}

/// One row per day for `DAYS * TICKERS` days, tickers cycling. The price
/// series covers one year and repeats for each block of `DAYS` rows.
fn stock_price_rows() -> Result<Vec<Vec<SqlValue>>> {
    (0..DAYS * TICKERS.len())
        .map(|index| {
            Ok(vec![
                SqlValue::Text(day(index)?),
                SqlValue::Text(TICKERS[index % TICKERS.len()].to_string()),
                SqlValue::Real(round2(150.0 + (index % DAYS) as f64 * 0.5)),
            ])
        })
        .collect()
}

fn company_financial_rows() -> Vec<Vec<SqlValue>> {
    (0..FINANCIAL_ENTRIES)
        .map(|index| {
            vec![
                SqlValue::Text(TICKERS[index % TICKERS.len()].to_string()),
                SqlValue::Real(round2(274.5 + index as f64 * 10.0)),
                SqlValue::Real(round2(57.4 + index as f64 * 2.0)),
            ]
        })
        .collect()
}

fn market_index_rows() -> Result<Vec<Vec<SqlValue>>> {
    (0..(DAYS + 1) * INDICES.len())
        .map(|index| {
            let value = 4500 + i64::try_from(index).context("row index overflows i64")? * 10;
            Ok(vec![
                SqlValue::Text(INDICES[index % INDICES.len()].to_string()),
                SqlValue::Integer(value),
                SqlValue::Text(day(index)?),
            ])
        })
        .collect()
}

fn day(offset: usize) -> Result<String> {
    let offset = i64::try_from(offset).context("day offset overflows i64")?;
    START_DATE
        .checked_add(Duration::days(offset))
        .context("sample date out of range")?
        .format(format_description!("[year]-[month]-[day]"))
        .context("failed to format sample date")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use rusqlite::Connection;

    use super::write_sample_database;

    fn temp_db_path(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be after epoch")
            .as_nanos();
        std::env::temp_dir()
            .join(format!("querydash-seed-{tag}-{nanos}"))
            .join("sample_data.db")
    }

    fn scalar<T: rusqlite::types::FromSql>(connection: &Connection, sql: &str) -> T {
        connection
            .query_row(sql, [], |row| row.get(0))
            .expect("scalar query should succeed")
    }

    #[test]
    fn writes_expected_row_counts_and_ranges() {
        let path = temp_db_path("counts");
        let stats = write_sample_database(&path).expect("seed should succeed");
        assert_eq!(stats.stock_prices, 1825);
        assert_eq!(stats.company_financials, 100);
        assert_eq!(stats.market_indices, 1098);

        let connection = Connection::open(&path).expect("seeded db should open");
        assert_eq!(
            scalar::<String>(&connection, "SELECT MIN(date) FROM stock_prices"),
            "2024-01-01"
        );
        assert_eq!(
            scalar::<f64>(&connection, "SELECT price FROM stock_prices WHERE date = '2024-12-30'"),
            332.0
        );
        // 2024 is a leap year: day 366 restarts the yearly price series.
        assert_eq!(
            scalar::<f64>(&connection, "SELECT price FROM stock_prices WHERE date = '2024-12-31'"),
            150.0
        );
        assert_eq!(
            scalar::<String>(
                &connection,
                "SELECT ticker FROM stock_prices WHERE date = '2024-01-06'"
            ),
            "AAPL"
        );
    }

    #[test]
    fn reseeding_replaces_tables() {
        let path = temp_db_path("reseed");
        write_sample_database(&path).expect("first seed should succeed");
        write_sample_database(&path).expect("second seed should succeed");

        let connection = Connection::open(&path).expect("seeded db should open");
        assert_eq!(scalar::<i64>(&connection, "SELECT COUNT(*) FROM market_indices"), 1098);
    }
}
