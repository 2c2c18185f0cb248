use std::fmt::Debug;

use anyhow::Result;

use crate::models::QueryResult;

/// A live connection handed out by a [`ConnectionFactory`].
///
/// `close` consumes the connection; the executor calls it exactly once per
/// acquisition.
pub trait SourceConnection: Send {
    fn query(&mut self, sql: &str, params: &[String]) -> Result<QueryResult>;

    fn close(self: Box<Self>) -> Result<()>;
}

/// Produces a fresh connection per call. Must not hold a shared connection.
pub trait ConnectionFactory: Send + Sync + Debug {
    fn connect(&self) -> Result<Box<dyn SourceConnection>>;

    fn describe(&self) -> String;
}
