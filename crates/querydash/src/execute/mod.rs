use thiserror::Error;

use crate::bind::BoundQuery;
use crate::models::QueryResult;
use crate::source::{SourceConfig, SourceConnection};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("query text is empty")]
    EmptyQuery,

    #[error("failed to acquire connection: {0}")]
    ConnectionFailed(String),

    #[error("query failed: {0}")]
    QueryFailed(String),
}

impl ExecError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyQuery => "exec_empty_query",
            Self::ConnectionFailed(_) => "exec_connection_failed",
            Self::QueryFailed(_) => "exec_query_failed",
        }
    }
}

pub fn execute(bound: &BoundQuery, source: &SourceConfig) -> Result<QueryResult, ExecError> {
    if bound.is_blank() {
        return Err(ExecError::EmptyQuery);
    }

    let connection = source
        .get_connection()
        .map_err(|error| ExecError::ConnectionFailed(format!("{error:#}")))?;
    let mut guard = ConnectionGuard::new(connection);

    let result = guard
        .query(&bound.sql, &bound.params)
        .map_err(|error| ExecError::QueryFailed(format!("{error:#}")));
    guard.release();

    result
}

/// Owns a connection until it is released explicitly or dropped.
pub struct ConnectionGuard {
    connection: Option<Box<dyn SourceConnection>>,
}

impl ConnectionGuard {
    #[must_use]
    pub fn new(connection: Box<dyn SourceConnection>) -> Self {
        Self {
            connection: Some(connection),
        }
    }

    pub fn query(&mut self, sql: &str, params: &[String]) -> anyhow::Result<QueryResult> {
        match self.connection.as_mut() {
            Some(connection) => connection.query(sql, params),
            None => anyhow::bail!("connection already released"),
        }
    }

    /// Closes the connection. Later calls and the eventual drop are no-ops.
    pub fn release(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        if let Err(error) = connection.close() {
            tracing::warn!(error = %format!("{error:#}"), "failed to close connection");
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{Result, bail};

    use super::{ConnectionGuard, ExecError, execute};
    use crate::bind::bind_literal;
    use crate::models::QueryResult;
    use crate::source::{
        ConnectionFactory, PlaceholderMatcher, RegexMatcher, SourceConfig, SourceConnection,
        SubstitutionMode,
    };

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Behavior {
        Rows,
        Fail,
        Panic,
        RefuseConnect,
    }

    #[derive(Debug)]
    struct CountingFactory {
        behavior: Behavior,
        opened: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    }

    struct CountingConnection {
        behavior: Behavior,
        closed: Arc<AtomicUsize>,
    }

    impl SourceConnection for CountingConnection {
        fn query(&mut self, _sql: &str, params: &[String]) -> Result<QueryResult> {
            match self.behavior {
                Behavior::Rows => Ok(QueryResult::new(
                    vec!["n".to_string()],
                    vec![vec![serde_json::json!(params.len())]],
                )),
                Behavior::Fail => bail!("no such table: missing"),
                Behavior::Panic => panic!("driver exploded"),
                Behavior::RefuseConnect => unreachable!("connect refused earlier"),
            }
        }

        fn close(self: Box<Self>) -> Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl ConnectionFactory for CountingFactory {
        fn connect(&self) -> Result<Box<dyn SourceConnection>> {
            if self.behavior == Behavior::RefuseConnect {
                bail!("database is locked");
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingConnection {
                behavior: self.behavior,
                closed: Arc::clone(&self.closed),
            }))
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    struct Harness {
        config: SourceConfig,
        opened: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    }

    fn harness(behavior: Behavior) -> Harness {
        let opened = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let factory: Arc<dyn ConnectionFactory> = Arc::new(CountingFactory {
            behavior,
            opened: Arc::clone(&opened),
            closed: Arc::clone(&closed),
        });
        let matcher: Arc<dyn PlaceholderMatcher> =
            Arc::new(RegexMatcher::new(r"'(\w+)'").expect("pattern should compile"));
        let config = SourceConfig::new(
            "counting",
            "/nonexistent/queries",
            "/nonexistent/reports",
            factory,
            matcher,
            SubstitutionMode::Bound,
        );
        Harness {
            config,
            opened,
            closed,
        }
    }

    #[test]
    fn blank_sql_never_connects() {
        let harness = harness(Behavior::Rows);
        let error = execute(&bind_literal("   "), &harness.config).expect_err("blank sql");
        assert_eq!(error, ExecError::EmptyQuery);
        assert_eq!(harness.opened.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn success_releases_once() {
        let harness = harness(Behavior::Rows);
        let result = execute(&bind_literal("SELECT 1"), &harness.config).expect("query succeeds");
        assert_eq!(result.row_count(), 1);
        assert_eq!(harness.opened.load(Ordering::SeqCst), 1);
        assert_eq!(harness.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failure_carries_message_and_releases_once() {
        let harness = harness(Behavior::Fail);
        let error = execute(&bind_literal("SELECT * FROM missing"), &harness.config)
            .expect_err("query fails");
        assert_eq!(
            error,
            ExecError::QueryFailed("no such table: missing".to_string())
        );
        assert_eq!(harness.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panic_mid_query_still_releases_once() {
        let harness = harness(Behavior::Panic);
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            execute(&bind_literal("SELECT 1"), &harness.config)
        }));
        assert!(outcome.is_err());
        assert_eq!(harness.opened.load(Ordering::SeqCst), 1);
        assert_eq!(harness.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn refused_connection_is_reported() {
        let harness = harness(Behavior::RefuseConnect);
        let error = execute(&bind_literal("SELECT 1"), &harness.config).expect_err("no connection");
        assert_eq!(
            error,
            ExecError::ConnectionFailed("database is locked".to_string())
        );
        assert_eq!(harness.closed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn concurrent_executions_use_their_own_connections() {
        let harness = harness(Behavior::Rows);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    execute(&bind_literal("SELECT 1"), &harness.config).expect("query succeeds");
                });
            }
        });
        assert_eq!(harness.opened.load(Ordering::SeqCst), 8);
        assert_eq!(harness.closed.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn explicit_release_makes_drop_a_no_op() {
        let harness = harness(Behavior::Rows);
        let connection = harness
            .config
            .get_connection()
            .expect("counting factory connects");
        let mut guard = ConnectionGuard::new(connection);
        guard.release();
        guard.release();
        assert!(guard.query("SELECT 1", &[]).is_err());
        drop(guard);
        assert_eq!(harness.closed.load(Ordering::SeqCst), 1);
    }
}
