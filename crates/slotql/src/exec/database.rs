use super::placeholders::{Positional, from_named, from_question_marks};
use crate::batch::{BatchInsert, BatchStatement};
use crate::client::GenericClient;
use crate::config::DatabaseConfig;
use crate::error::{QbError, QbResult};
use crate::qb::{BindMap, Built, Method, QueryBuilder};
use crate::row::FromRow;
use serde::Serialize;
use std::time::Instant;
use tokio_postgres::Row;
use tokio_postgres::types::FromSqlOwned;

/// Outcome of [`Database::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunResult {
    /// Generated id of an inserted row.
    InsertId(i64),
    RowsAffected(u64),
}

impl RunResult {
    pub fn insert_id(self) -> Option<i64> {
        match self {
            RunResult::InsertId(id) => Some(id),
            RunResult::RowsAffected(_) => None,
        }
    }

    pub fn rows_affected(self) -> Option<u64> {
        match self {
            RunResult::RowsAffected(n) => Some(n),
            RunResult::InsertId(_) => None,
        }
    }
}

/// Truncate to at most `max_bytes`, backing off to a char boundary.
fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Statement executor over any [`GenericClient`].
///
/// # Example
/// ```ignore
/// use slotql::{Database, DatabaseConfig, qb::{self, Fields}};
///
/// let pool = slotql::create_pool(&config)?;
/// let client = pool.get().await?;
/// let db = Database::new(&client).with_config(config.clone());
///
/// let id = db
///     .run(&qb::insert("users", Fields::new().set("username", "alice"))?)
///     .await?
///     .insert_id();
/// let users: Vec<User> = db
///     .find_all_as(&qb::select("*").from("users").order("id"))
///     .await?;
/// ```
pub struct Database<'a, C: GenericClient> {
    client: &'a C,
    config: DatabaseConfig,
}

impl<'a, C: GenericClient> Database<'a, C> {
    /// Wrap a client with the default configuration.
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            config: DatabaseConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DatabaseConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        self.client
    }

    fn display_sql<'s>(&self, sql: &'s str) -> std::borrow::Cow<'s, str> {
        match self.config.max_logged_sql_length {
            Some(max) if sql.len() > max => {
                format!("{}...", truncate_sql_bytes(sql, max)).into()
            }
            _ => sql.into(),
        }
    }

    /// Run `future` under the configured timeout, logging the statement.
    async fn observe<T, F>(&self, method: Method, statement: &Positional, future: F) -> QbResult<T>
    where
        F: std::future::Future<Output = QbResult<T>> + Send,
    {
        if self.config.log_sql {
            tracing::debug!(
                target: "slotql.sql",
                method = %method,
                param_count = statement.params.len(),
                sql = %self.display_sql(&statement.sql),
                "executing statement"
            );
        }

        let start = Instant::now();
        let result = match self.config.query_timeout {
            Some(timeout) => {
                tokio::pin!(future);
                tokio::select! {
                    result = &mut future => result,
                    _ = tokio::time::sleep(timeout) => {
                        if let Some(cancel_token) = self.client.cancel_token() {
                            tokio::spawn(async move {
                                let _ = cancel_token.cancel_query(tokio_postgres::NoTls).await;
                            });
                        }
                        tracing::warn!(
                            target: "slotql.sql",
                            method = %method,
                            timeout_ms = timeout.as_millis() as u64,
                            sql = %self.display_sql(&statement.sql),
                            "statement timed out"
                        );
                        Err(QbError::Timeout(timeout))
                    }
                }
            }
            None => future.await,
        };

        if self.config.log_sql {
            if let Err(ref err) = result {
                tracing::debug!(
                    target: "slotql.sql",
                    method = %method,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    error = %err,
                    "statement failed"
                );
            }
        }
        result
    }

    async fn query_rows(&self, built: &Built) -> QbResult<Vec<Row>> {
        let statement = from_named(&built.sql, &built.binds)?;
        let params = statement.param_refs();
        self.observe(
            built.method,
            &statement,
            self.client.query(&statement.sql, &params),
        )
        .await
    }

    async fn query_first(&self, built: &Built) -> QbResult<Option<Row>> {
        let statement = from_named(&built.sql, &built.binds)?;
        let params = statement.param_refs();
        self.observe(
            built.method,
            &statement,
            self.client.query_opt(&statement.sql, &params),
        )
        .await
    }

    async fn execute_statement(&self, method: Method, statement: &Positional) -> QbResult<u64> {
        let params = statement.param_refs();
        self.observe(method, statement, self.client.execute(&statement.sql, &params))
            .await
    }

    /// All rows.
    pub async fn find_all(&self, qb: &QueryBuilder) -> QbResult<Vec<Row>> {
        self.query_rows(&qb.build()).await
    }

    /// All rows mapped through [`FromRow`].
    pub async fn find_all_as<T: FromRow>(&self, qb: &QueryBuilder) -> QbResult<Vec<T>> {
        self.find_all(qb).await?.iter().map(T::from_row).collect()
    }

    /// First row, if any.
    pub async fn find_row(&self, qb: &QueryBuilder) -> QbResult<Option<Row>> {
        self.query_first(&qb.build()).await
    }

    /// First row mapped through [`FromRow`], if any.
    pub async fn find_row_as<T: FromRow>(&self, qb: &QueryBuilder) -> QbResult<Option<T>> {
        self.find_row(qb).await?.as_ref().map(T::from_row).transpose()
    }

    /// First column of every row.
    pub async fn find_col<T: FromSqlOwned>(&self, qb: &QueryBuilder) -> QbResult<Vec<T>> {
        self.find_all(qb)
            .await?
            .iter()
            .map(first_column)
            .collect()
    }

    /// First two columns of every row as key/value pairs, in row order.
    pub async fn find_assoc<K, V>(&self, qb: &QueryBuilder) -> QbResult<Vec<(K, V)>>
    where
        K: FromSqlOwned,
        V: FromSqlOwned,
    {
        self.find_all_as::<(K, V)>(qb).await
    }

    /// First column of the first row, if any.
    pub async fn find_one<T: FromSqlOwned>(&self, qb: &QueryBuilder) -> QbResult<Option<T>> {
        self.find_row(qb).await?.as_ref().map(first_column).transpose()
    }

    /// `COUNT(<column>)` over the statement, ignoring its ORDER/LIMIT/OFFSET.
    pub async fn find_count(&self, qb: &QueryBuilder, column: &str) -> QbResult<i64> {
        let counting = qb.clone().to_count_of(column)?;
        Ok(self.find_one::<i64>(&counting).await?.unwrap_or(0))
    }

    /// Execute a built statement.
    ///
    /// Inserts report the generated id when `insert_id_column` is configured;
    /// batch inserts report the summed row count of their chunks.
    pub async fn run_built(&self, built: &Built) -> QbResult<RunResult> {
        if let Some(ref batch) = built.batch {
            return self.run_statements(batch).await.map(RunResult::RowsAffected);
        }

        match (built.method, self.config.insert_id_column.as_deref()) {
            (Method::Insert, Some(column)) => {
                let returning = Built {
                    sql: format!("{} RETURNING {column}", built.sql),
                    ..built.clone()
                };
                let row = self
                    .query_first(&returning)
                    .await?
                    .ok_or_else(|| QbError::not_found("INSERT returned no row"))?;
                Ok(RunResult::InsertId(id_column(&row, column)?))
            }
            (method, _) => {
                let statement = from_named(&built.sql, &built.binds)?;
                self.execute_statement(method, &statement)
                    .await
                    .map(RunResult::RowsAffected)
            }
        }
    }

    /// Execute a builder's statement.
    pub async fn run(&self, qb: &QueryBuilder) -> QbResult<RunResult> {
        self.run_built(&qb.build()).await
    }

    /// Execute every chunk of a batch insert in order; returns the total row count.
    ///
    /// Not atomic on its own: pass a `Transaction` as the client when a failed
    /// chunk must undo the earlier ones.
    pub async fn run_multi(&self, batch: &BatchInsert) -> QbResult<u64> {
        self.run_statements(&batch.statements()?).await
    }

    /// Chunks run one after another on the same client. A failure after the
    /// first chunk is wrapped in [`QbError::BatchIncomplete`] with the rows
    /// already written; run on a transaction to make the batch atomic.
    async fn run_statements(&self, statements: &[BatchStatement]) -> QbResult<u64> {
        let mut total = 0;
        for (i, chunk) in statements.iter().enumerate() {
            let result = match from_question_marks(&chunk.sql, &chunk.values) {
                Ok(statement) => self.execute_statement(Method::InsertMulti, &statement).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(n) => total += n,
                Err(e) if i == 0 => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        target: "slotql.sql",
                        committed = total,
                        failed_chunk = i,
                        chunks = statements.len(),
                        "batch insert stopped partway"
                    );
                    return Err(QbError::BatchIncomplete {
                        committed: total,
                        failed_chunk: i,
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(total)
    }

    /// Execute hand-written SQL with optional `:name` parameters.
    pub async fn run_raw(&self, sql: &str, params: Option<&BindMap>) -> QbResult<u64> {
        let empty = BindMap::new();
        let statement = from_named(sql, params.unwrap_or(&empty))?;
        self.execute_statement(Method::Query, &statement).await
    }

    /// The statement and parameters that [`Database::run`] would send.
    pub fn debug_dump(&self, qb: &QueryBuilder) -> QbResult<String> {
        super::debug_dump(&qb.build())
    }
}

fn first_column<T: FromSqlOwned>(row: &Row) -> QbResult<T> {
    row.try_get(0).map_err(|e| QbError::decode("0", e.to_string()))
}

/// Generated ids come back as INT8 or INT4 depending on the column type.
fn id_column(row: &Row, column: &str) -> QbResult<i64> {
    row.try_get::<_, i64>(0)
        .or_else(|_| row.try_get::<_, i32>(0).map(i64::from))
        .map_err(|e| QbError::decode(column, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio_postgres::types::ToSql;

    /// Counts one row per bound value; the chunk at index `fail_at` fails.
    struct ChunkClient {
        fail_at: usize,
        executed: Mutex<Vec<String>>,
    }

    impl GenericClient for ChunkClient {
        async fn query(&self, _sql: &str, _params: &[&(dyn ToSql + Sync)]) -> QbResult<Vec<Row>> {
            Ok(Vec::new())
        }

        async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> QbResult<u64> {
            let mut executed = self.executed.lock().unwrap();
            if executed.len() == self.fail_at {
                return Err(QbError::UniqueViolation("t_a_key: duplicate".into()));
            }
            executed.push(sql.to_string());
            Ok(params.len() as u64)
        }
    }

    fn five_rows() -> BatchInsert {
        crate::qb::insert_multi("t", ["a"])
            .rows((1..=5).map(|i: i64| [i]))
            .chunk_size(2)
    }

    #[tokio::test]
    async fn batch_reports_rows_written_before_failing_chunk() {
        let client = ChunkClient {
            fail_at: 2,
            executed: Mutex::new(Vec::new()),
        };
        let err = Database::new(&client)
            .run_multi(&five_rows())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            QbError::BatchIncomplete { committed: 4, failed_chunk: 2, .. }
        ));
        assert!(err.is_unique_violation());
        assert_eq!(client.executed.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn first_chunk_failure_is_returned_as_is() {
        let client = ChunkClient {
            fail_at: 0,
            executed: Mutex::new(Vec::new()),
        };
        let err = Database::new(&client)
            .run_multi(&five_rows())
            .await
            .unwrap_err();
        assert!(matches!(err, QbError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn batch_sums_chunk_counts() {
        let client = ChunkClient {
            fail_at: usize::MAX,
            executed: Mutex::new(Vec::new()),
        };
        let total = Database::new(&client).run_multi(&five_rows()).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(
            client.executed.lock().unwrap()[0],
            "INSERT INTO t (a) VALUES ($1), ($2)"
        );
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_sql_bytes("SELECT 1", 100), "SELECT 1");
        assert_eq!(truncate_sql_bytes("SELECT 1", 6), "SELECT");
        assert_eq!(truncate_sql_bytes("héllo", 2), "h");
    }

    #[test]
    fn run_result_accessors() {
        assert_eq!(RunResult::InsertId(5).insert_id(), Some(5));
        assert_eq!(RunResult::InsertId(5).rows_affected(), None);
        assert_eq!(RunResult::RowsAffected(3).rows_affected(), Some(3));
    }
}
