//! Cursors
//!
//! A [`Cursor`] executes statements on its connection's session and keeps
//! the outcome of the last execution for read-back:
//!
//! - [`Cursor::row_counts`] - per-row affected counts of the last batch
//! - [`Cursor::batch_errors`] - rows rejected by the last batch
//! - [`Cursor::row_count`] - cumulative rows affected by the last execution
//! - [`Cursor::implicit_results`] - result sets returned by the last PL/SQL
//!   block
//!
//! Every execution replaces what the previous one left behind.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut cursor = conn.cursor()?;
//! let rows = vec![
//!     vec![1.into(), "First".into(), 100.into()],
//!     vec![1.into(), "Second".into(), 200.into()],
//! ];
//! let outcome = cursor
//!     .execute_many(
//!         "insert into t values (:1, :2, :3)",
//!         rows,
//!         BatchOptions::new().with_batch_errors().with_row_counts(),
//!     )
//!     .await?;
//!
//! assert_eq!(cursor.row_counts()?, &[1, 0]);
//! assert_eq!(cursor.batch_errors()[0].offset, 1);
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::batch::{BatchBinds, BatchError, BatchOptions, BatchResult, RowCounts, RowOutcomes};
use crate::connection::ConnectionInner;
use crate::error::{Error, Result};
use crate::implicit::ImplicitResult;
use crate::row::{Row, Value};
use crate::session::Session;
use crate::statement::Statement;

/// Implicit result sets left by the last execution
enum ImplicitState<R> {
    NotExecuted,
    Available(Vec<R>),
}

/// A cursor on a [`Connection`](crate::Connection)
///
/// Methods take `&mut self`: a cursor runs one execution at a time and its
/// read-back state always belongs to the last one.
pub struct Cursor<S: Session> {
    inner: Arc<Mutex<ConnectionInner<S>>>,
    connection_id: u32,
    arraysize: usize,
    batch_timeout: Option<Duration>,
    row_counts: RowCounts,
    batch_errors: Vec<BatchError>,
    rowcount: u64,
    implicit: ImplicitState<S::ResultSet>,
    /// Rows of the last query
    query: Option<ImplicitResult<S::ResultSet>>,
    last_was_query: bool,
}

impl<S: Session> Cursor<S> {
    pub(crate) fn new(
        inner: Arc<Mutex<ConnectionInner<S>>>,
        connection_id: u32,
        arraysize: usize,
        batch_timeout: Option<Duration>,
    ) -> Self {
        Self {
            inner,
            connection_id,
            arraysize,
            batch_timeout,
            row_counts: RowCounts::AccountingDisabled,
            batch_errors: Vec::new(),
            rowcount: 0,
            implicit: ImplicitState::NotExecuted,
            query: None,
            last_was_query: false,
        }
    }

    /// ID of the connection this cursor runs on
    pub fn connection_id(&self) -> u32 {
        self.connection_id
    }

    /// Rows fetched per round trip for queries and implicit results
    pub fn arraysize(&self) -> usize {
        self.arraysize
    }

    /// Set the rows fetched per round trip
    pub fn set_arraysize(&mut self, arraysize: usize) {
        self.arraysize = arraysize.max(1);
    }

    /// Deadline applied to batches that do not set their own
    pub fn batch_timeout(&self) -> Option<Duration> {
        self.batch_timeout
    }

    /// Set the deadline applied to batches that do not set their own
    pub fn set_batch_timeout(&mut self, timeout: Option<Duration>) {
        self.batch_timeout = timeout;
    }

    /// Execute one statement against many rows of bind values
    ///
    /// See [`Cursor::execute_batch`].
    pub async fn execute_many(
        &mut self,
        sql: &str,
        rows: impl IntoIterator<Item = Vec<Value>>,
        options: BatchOptions,
    ) -> Result<BatchResult> {
        let mut batch = BatchBinds::new(sql);
        batch.rows.extend(rows);
        batch.with_options(options);
        self.execute_batch(&batch).await
    }

    /// Execute a batch, one execution per bind row
    ///
    /// The statement text and the arity of every row are checked before any
    /// row runs. Rows then run in order against one prepared statement:
    ///
    /// - with batch errors enabled, a row the database rejects is recorded
    ///   as a [`BatchError`] and the batch carries on;
    /// - otherwise the first rejected row stops the batch and the call fails
    ///   with [`Error::RowFailure`]. Counts of the rows applied before it stay
    ///   readable through [`Cursor::row_counts`].
    ///
    /// Errors that are not about a single row (a closed connection, for
    /// instance) always end the call. When the batch has a deadline and it
    /// expires, the call fails with [`Error::BatchTimeout`] carrying the
    /// outcome of the rows that finished.
    pub async fn execute_batch(&mut self, batch: &BatchBinds) -> Result<BatchResult> {
        self.reset();
        batch.validate()?;

        let options = batch.options();
        let started = Instant::now();
        let deadline = options.timeout.or(self.batch_timeout).map(|t| started + t);

        let conn = Arc::clone(&self.inner);
        let mut inner = conn.lock().await;
        inner.ensure_open()?;

        if batch.is_empty() {
            let result = RowOutcomes::new(0).finish(options.array_dml_row_counts);
            self.record(&result);
            self.implicit = ImplicitState::Available(Vec::new());
            return Ok(result);
        }

        let statement = inner.prepare(batch.statement.clone()).await?;
        self.implicit = ImplicitState::Available(Vec::new());
        tracing::debug!(
            connection_id = self.connection_id,
            sql = statement.sql(),
            rows = batch.row_count(),
            batch_errors = options.batch_errors,
            row_counts = options.array_dml_row_counts,
            "Executing batch"
        );

        let mut outcomes = RowOutcomes::new(batch.row_count());
        for (offset, row) in batch.rows.iter().enumerate() {
            let executed = match deadline {
                Some(deadline) => {
                    tokio::time::timeout_at(deadline, inner.execute(&statement, row)).await
                }
                None => Ok(inner.execute(&statement, row).await),
            };

            let Ok(executed) = executed else {
                inner.release(statement);
                let completed = outcomes.finish(options.array_dml_row_counts);
                self.record(&completed);
                let elapsed = started.elapsed();
                tracing::warn!(
                    connection_id = self.connection_id,
                    completed = completed.rows_processed(),
                    rows = batch.row_count(),
                    ?elapsed,
                    "Batch timed out"
                );
                return Err(Error::BatchTimeout {
                    elapsed,
                    completed: Box::new(completed),
                });
            };

            let execution = match executed {
                Ok(execution) => execution,
                Err(e) => match e.into_row_error() {
                    Ok((code, message)) if options.batch_errors => {
                        tracing::debug!(offset, code, "Row rejected");
                        outcomes.reject(offset, code, message);
                        continue;
                    }
                    Ok((code, message)) => {
                        inner.release(statement);
                        let applied = outcomes.finish(options.array_dml_row_counts);
                        self.record(&applied);
                        tracing::warn!(
                            connection_id = self.connection_id,
                            offset,
                            code,
                            "Batch aborted by row failure"
                        );
                        return Err(Error::RowFailure {
                            offset,
                            code,
                            message,
                        });
                    }
                    Err(e) => {
                        inner.release(statement);
                        return Err(e);
                    }
                },
            };
            outcomes.apply(offset, execution.rows_affected);
        }

        inner.release(statement);
        let result = outcomes.finish(options.array_dml_row_counts);
        self.record(&result);

        if options.auto_commit {
            inner.commit().await?;
        }

        tracing::debug!(
            connection_id = self.connection_id,
            rows_affected = result.total_rows_affected,
            failures = result.failure_count,
            "Batch completed"
        );
        Ok(result)
    }

    /// Execute a single statement, returning the number of rows affected
    ///
    /// A query's rows are read with [`Cursor::fetch_one`] and
    /// [`Cursor::fetch_all`]; result sets returned by a PL/SQL block are
    /// collected with [`Cursor::implicit_results`].
    pub async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        self.reset();
        if sql.trim().is_empty() {
            return Err(Error::EmptyStatement);
        }
        let statement = Statement::new(sql);
        statement.check_binds(0, params)?;

        let conn = Arc::clone(&self.inner);
        let mut inner = conn.lock().await;
        inner.ensure_open()?;

        let statement = inner.prepare(statement).await?;
        let executed = inner.execute(&statement, params).await;
        let is_query = statement.is_query();
        inner.release(statement);
        drop(inner);

        let execution = executed?;
        self.rowcount = execution.rows_affected;
        self.implicit = ImplicitState::Available(execution.implicit_results);
        self.last_was_query = is_query || execution.result_set.is_some();
        self.query = execution
            .result_set
            .map(|rs| ImplicitResult::new(0, rs, self.arraysize));

        tracing::trace!(
            connection_id = self.connection_id,
            rows_affected = self.rowcount,
            "Statement executed"
        );
        Ok(self.rowcount)
    }

    /// Fetch the next row of the last query
    pub async fn fetch_one(&mut self) -> Result<Option<Row>> {
        if !self.last_was_query {
            return Err(Error::interface(
                "the last statement executed was not a query",
            ));
        }
        match self.query.as_mut() {
            Some(rows) => rows.next_row().await,
            None => Ok(None),
        }
    }

    /// Fetch every remaining row of the last query
    pub async fn fetch_all(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetch_one().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Rows affected by each bind row of the last batch
    ///
    /// Fails with [`Error::RowCountsUnavailable`] unless the last batch
    /// enabled array DML row counts.
    pub fn row_counts(&self) -> Result<&[u64]> {
        self.row_counts.get()
    }

    /// Rows rejected by the last batch, ordered by offset
    pub fn batch_errors(&self) -> &[BatchError] {
        &self.batch_errors
    }

    /// Rows affected by the last execution
    ///
    /// For a batch this is the sum over the rows that succeeded, not the
    /// number of rows submitted.
    pub fn row_count(&self) -> u64 {
        self.rowcount
    }

    /// Take the result sets returned by the last executed PL/SQL block
    ///
    /// The result sets come back in the order the block returned them, each
    /// as an independent handle. They are handed over once: a second call
    /// returns an empty vector until the next execution.
    pub fn implicit_results(&mut self) -> Result<Vec<ImplicitResult<S::ResultSet>>> {
        let arraysize = self.arraysize;
        match &mut self.implicit {
            ImplicitState::NotExecuted => Err(Error::interface("no statement executed")),
            ImplicitState::Available(sets) => Ok(std::mem::take(sets)
                .into_iter()
                .enumerate()
                .map(|(index, rs)| ImplicitResult::new(index, rs, arraysize))
                .collect()),
        }
    }

    fn reset(&mut self) {
        self.row_counts = RowCounts::AccountingDisabled;
        self.batch_errors.clear();
        self.rowcount = 0;
        self.implicit = ImplicitState::NotExecuted;
        self.query = None;
        self.last_was_query = false;
    }

    fn record(&mut self, result: &BatchResult) {
        self.row_counts = result.row_counts.clone();
        self.batch_errors = result.errors.clone();
        self.rowcount = result.total_rows_affected;
    }
}

impl<S: Session> std::fmt::Debug for Cursor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("connection_id", &self.connection_id)
            .field("arraysize", &self.arraysize)
            .field("rowcount", &self.rowcount)
            .field("row_counts", &self.row_counts)
            .field("batch_errors", &self.batch_errors.len())
            .finish()
    }
}
