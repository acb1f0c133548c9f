//! Query execution engine.
//!
//! This module provides query execution functionality with support for:
//! - Parameterized statements (positional, driver-bound)
//! - Full cursor draining into normalized records
//! - Per-statement timeouts and caller cancellation
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific query and write operations
//! - `postgres`: PostgreSQL-specific query and write operations
//! - `sqlite`: SQLite-specific query and write operations
//!
//! Each submodule provides identical functionality adapted to the database's type system.
//!
//! Statement text is never logged; only its length and parameter count are.

use crate::db::params::bind_params;
use crate::db::pool::{DbConnection, DbPool};
use crate::db::row::{project, unique_column_names};
use crate::db::types::{CoercionOptions, DecodeRow};
use crate::error::{BridgeError, BridgeResult};
use crate::models::{DatabaseType, ExecuteOutcome, QueryParam, ResultSet};
use futures_util::{Stream, TryStreamExt};
use sqlx::Executor;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Rows drained between voluntary yields, so cancellation is observed even
/// when the driver always has the next row ready.
const YIELD_EVERY_ROWS: usize = 256;

/// Runs statements against one database connection.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    connection: Arc<DbConnection>,
    query_timeout: Duration,
    options: CoercionOptions,
}

impl QueryExecutor {
    pub fn new(connection: Arc<DbConnection>, query_timeout: Duration) -> Self {
        Self {
            connection,
            query_timeout,
            options: CoercionOptions::default(),
        }
    }

    /// Set how cells are coerced (e.g. keep raw bytes).
    pub fn with_options(mut self, options: CoercionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn db_type(&self) -> DatabaseType {
        self.connection.db_type()
    }

    pub fn is_writable(&self) -> bool {
        self.connection.is_writable()
    }

    pub fn connection(&self) -> &Arc<DbConnection> {
        &self.connection
    }

    /// Run a statement that returns rows and drain the whole cursor.
    ///
    /// Any row or decode failure aborts the call; no partial result is returned.
    pub async fn query(
        &self,
        sql: &str,
        params: &[QueryParam],
        cancel: &CancellationToken,
    ) -> BridgeResult<ResultSet> {
        debug!(
            sql_len = sql.len(),
            params = params.len(),
            timeout_secs = self.query_timeout.as_secs(),
            "Executing query"
        );

        let options = self.options;
        let result = self
            .guarded("query", cancel, |pool| async move {
                match pool {
                    DbPool::MySql(p) => mysql::fetch(p, sql, params, options).await,
                    DbPool::Postgres(p) => postgres::fetch(p, sql, params, options).await,
                    DbPool::SQLite(p) => sqlite::fetch(p, sql, params, options).await,
                }
            })
            .await?;

        debug!(row_count = result.row_count(), "Query finished");
        Ok(result)
    }

    /// Run a statement that returns no result set.
    pub async fn execute(
        &self,
        sql: &str,
        params: &[QueryParam],
        cancel: &CancellationToken,
    ) -> BridgeResult<ExecuteOutcome> {
        debug!(
            sql_len = sql.len(),
            params = params.len(),
            timeout_secs = self.query_timeout.as_secs(),
            "Executing statement"
        );

        let rows_affected = self
            .guarded("statement", cancel, |pool| async move {
                match pool {
                    DbPool::MySql(p) => mysql::execute(p, sql, params).await,
                    DbPool::Postgres(p) => postgres::execute(p, sql, params).await,
                    DbPool::SQLite(p) => sqlite::execute(p, sql, params).await,
                }
            })
            .await?;

        debug!(rows_affected, "Statement finished");
        Ok(ExecuteOutcome { rows_affected })
    }

    /// Race `work` against the caller's token and the statement timeout.
    ///
    /// Losing the race drops the statement future and interrupts the
    /// statement inside the engine, so the connection is idle again before
    /// the caller sees the error. Statements take turns on the connection;
    /// an interrupt only ever reaches the statement of the turn holder.
    async fn guarded<'a, T, F, Fut>(
        &'a self,
        operation: &'static str,
        cancel: &CancellationToken,
        work: F,
    ) -> BridgeResult<T>
    where
        F: FnOnce(&'a DbPool) -> Fut,
        Fut: Future<Output = BridgeResult<T>>,
    {
        if cancel.is_cancelled() {
            return Err(BridgeError::cancelled(operation));
        }
        let pool = self.connection.pool()?;
        let _turn = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BridgeError::cancelled(operation)),
            turn = self.connection.turn() => turn?,
        };
        let start = Instant::now();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BridgeError::cancelled(operation)),
            outcome = timeout(self.query_timeout, work(pool)) => match outcome {
                Ok(result) => result,
                Err(_) => Err(BridgeError::timeout(operation, self.query_timeout.as_secs())),
            },
        };

        if matches!(
            result,
            Err(BridgeError::Cancelled { .. } | BridgeError::Timeout { .. })
        ) {
            self.connection.interrupt().await;
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => debug!(operation, elapsed_ms, "Database call completed"),
            Err(e) if e.is_connection_loss() => {
                warn!(operation, elapsed_ms, error = %e, "Database connection failed");
                self.connection.mark_broken();
            }
            Err(e) => debug!(operation, elapsed_ms, error = %e, "Database call failed"),
        }
        result
    }
}

// =============================================================================
// Common Helper Functions
// =============================================================================

/// Drain a row stream into a [`ResultSet`]. The first failing row aborts.
async fn drain<R, S>(mut stream: S, options: CoercionOptions) -> BridgeResult<ResultSet>
where
    R: DecodeRow,
    S: Stream<Item = Result<R, sqlx::Error>> + Unpin,
{
    let mut names: Option<Vec<String>> = None;
    let mut records = Vec::new();

    while let Some(row) = stream.try_next().await? {
        let names = names.get_or_insert_with(|| row.column_names());
        records.push(project(names, row.decode_values()?, options));

        if records.len() % YIELD_EVERY_ROWS == 0 {
            tokio::task::yield_now().await;
        }
    }

    Ok(ResultSet {
        columns: names.map(|n| unique_column_names(&n)).unwrap_or_default(),
        records,
    })
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.
// The code structure is intentionally parallel to make differences obvious.

mod mysql {
    use super::*;
    use sqlx::Column;
    use sqlx::MySqlPool;

    pub async fn fetch(
        pool: &MySqlPool,
        sql: &str,
        params: &[QueryParam],
        options: CoercionOptions,
    ) -> BridgeResult<ResultSet> {
        // When params is empty, use raw SQL to avoid prepared statement issues
        let stream = if params.is_empty() {
            pool.fetch(sql)
        } else {
            bind_params(sqlx::query(sql), params).fetch(pool)
        };

        let mut result = drain(stream, options).await?;
        if result.columns.is_empty() {
            result.columns = match pool.describe(sql).await {
                Ok(d) => unique_column_names(
                    &d.columns().iter().map(|c| c.name().to_string()).collect::<Vec<_>>(),
                ),
                Err(e) => {
                    debug!(error = %e, "Could not describe empty result");
                    Vec::new()
                }
            };
        }
        Ok(result)
    }

    pub async fn execute(pool: &MySqlPool, sql: &str, params: &[QueryParam]) -> BridgeResult<u64> {
        // Some SQL like CREATE PROCEDURE doesn't support prepared statements
        let result = if params.is_empty() {
            pool.execute(sql).await?
        } else {
            bind_params(sqlx::query(sql), params).execute(pool).await?
        };
        Ok(result.rows_affected())
    }
}

mod postgres {
    use super::*;
    use sqlx::Column;
    use sqlx::PgPool;

    pub async fn fetch(
        pool: &PgPool,
        sql: &str,
        params: &[QueryParam],
        options: CoercionOptions,
    ) -> BridgeResult<ResultSet> {
        let stream = if params.is_empty() {
            pool.fetch(sql)
        } else {
            bind_params(sqlx::query(sql), params).fetch(pool)
        };

        let mut result = drain(stream, options).await?;
        if result.columns.is_empty() {
            result.columns = match pool.describe(sql).await {
                Ok(d) => unique_column_names(
                    &d.columns().iter().map(|c| c.name().to_string()).collect::<Vec<_>>(),
                ),
                Err(e) => {
                    debug!(error = %e, "Could not describe empty result");
                    Vec::new()
                }
            };
        }
        Ok(result)
    }

    pub async fn execute(pool: &PgPool, sql: &str, params: &[QueryParam]) -> BridgeResult<u64> {
        let result = if params.is_empty() {
            pool.execute(sql).await?
        } else {
            bind_params(sqlx::query(sql), params).execute(pool).await?
        };
        Ok(result.rows_affected())
    }
}

mod sqlite {
    use super::*;
    use sqlx::Column;
    use sqlx::SqlitePool;

    pub async fn fetch(
        pool: &SqlitePool,
        sql: &str,
        params: &[QueryParam],
        options: CoercionOptions,
    ) -> BridgeResult<ResultSet> {
        let stream = if params.is_empty() {
            pool.fetch(sql)
        } else {
            bind_params(sqlx::query(sql), params).fetch(pool)
        };

        let mut result = drain(stream, options).await?;
        if result.columns.is_empty() {
            result.columns = match pool.describe(sql).await {
                Ok(d) => unique_column_names(
                    &d.columns().iter().map(|c| c.name().to_string()).collect::<Vec<_>>(),
                ),
                Err(e) => {
                    debug!(error = %e, "Could not describe empty result");
                    Vec::new()
                }
            };
        }
        Ok(result)
    }

    pub async fn execute(pool: &SqlitePool, sql: &str, params: &[QueryParam]) -> BridgeResult<u64> {
        let result = if params.is_empty() {
            pool.execute(sql).await?
        } else {
            bind_params(sqlx::query(sql), params).execute(pool).await?
        };
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::types::RawValue;

    async fn memory_executor(query_timeout: Duration) -> QueryExecutor {
        let mut config = DatabaseConfig::parse("sqlite::memory:").unwrap();
        config.writable = true;
        config.connect_timeout = Duration::from_secs(3);
        let conn = DbConnection::connect(&config).await.unwrap();
        QueryExecutor::new(Arc::new(conn), query_timeout)
    }

    /// Row whose values decode only when `ok` is set.
    struct StubRow {
        ok: bool,
    }

    impl DecodeRow for StubRow {
        fn column_names(&self) -> Vec<String> {
            vec!["a".to_string()]
        }

        fn decode_values(&self) -> BridgeResult<Vec<RawValue>> {
            if self.ok {
                Ok(vec![RawValue::Int(1)])
            } else {
                Err(BridgeError::decode("column a: bytes are not valid UTF-8"))
            }
        }
    }

    #[tokio::test]
    async fn test_drain_aborts_on_failing_row() {
        let rows = futures_util::stream::iter(vec![
            Ok::<_, sqlx::Error>(StubRow { ok: true }),
            Ok(StubRow { ok: false }),
            Ok(StubRow { ok: true }),
        ]);
        let err = drain(rows, CoercionOptions::default()).await.unwrap_err();
        assert!(matches!(err, BridgeError::Decode { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_drain_keeps_every_good_row() {
        let rows = futures_util::stream::iter(vec![
            Ok::<_, sqlx::Error>(StubRow { ok: true }),
            Ok(StubRow { ok: true }),
        ]);
        let result = drain(rows, CoercionOptions::default()).await.unwrap();
        assert_eq!(result.columns, vec!["a"]);
        assert_eq!(result.row_count(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_aggregate_frees_connection() {
        let executor = memory_executor(Duration::from_secs(60)).await;
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            executor.query(
                "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x+1 FROM c LIMIT 2000000000) SELECT count(*) FROM c",
                &[],
                &cancel,
            ),
        )
        .await
        .unwrap()
        .unwrap_err();
        assert!(matches!(err, BridgeError::Cancelled { .. }));

        let next = tokio::time::timeout(
            Duration::from_secs(2),
            executor.query("SELECT 1", &[], &CancellationToken::new()),
        )
        .await
        .unwrap();
        assert_eq!(next.unwrap().row_count(), 1);
    }

    #[tokio::test]
    async fn test_query_returns_columns_and_rows() {
        let executor = memory_executor(Duration::from_secs(5)).await;
        let cancel = CancellationToken::new();
        let result = executor
            .query("SELECT 1 AS a, 'x' AS b", &[], &cancel)
            .await
            .unwrap();
        assert_eq!(result.columns, vec!["a", "b"]);
        assert_eq!(result.row_count(), 1);
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_is_cancelled() {
        let executor = memory_executor(Duration::from_secs(5)).await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = executor.query("SELECT 1", &[], &cancel).await.unwrap_err();
        assert!(matches!(err, BridgeError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_timeout_on_endless_query() {
        let executor = memory_executor(Duration::from_millis(100)).await;
        let cancel = CancellationToken::new();
        let err = executor
            .query(
                "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT x FROM c",
                &[],
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_rejected_statement_keeps_connection_usable() {
        let executor = memory_executor(Duration::from_secs(5)).await;
        let cancel = CancellationToken::new();
        let err = executor
            .query("SELECT * FROM no_such_table", &[], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Database { .. }));
        assert!(!executor.connection().is_broken());
        assert!(executor.query("SELECT 1", &[], &cancel).await.is_ok());
    }

    #[tokio::test]
    async fn test_broken_connection_fails_fast() {
        let executor = memory_executor(Duration::from_secs(5)).await;
        executor.connection().mark_broken();
        let err = executor
            .query("SELECT 1", &[], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_connection_loss());
    }
}
