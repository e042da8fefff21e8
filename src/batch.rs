//! Batch execution support
//!
//! This module provides the types used to execute one statement against many
//! rows of bind values (the executemany pattern) and to report the outcome of
//! every row.
//!
//! Two options shape the outcome:
//!
//! - **batch errors**: row-level failures are collected as [`BatchError`]s and
//!   every row is still attempted. Without it, the first failing row aborts
//!   the batch and its error is returned from the call.
//! - **array DML row counts**: the number of rows each bind row affected is
//!   recorded. Without it, [`RowCounts::get`] fails with
//!   [`Error::RowCountsUnavailable`].
//!
//! # Example
//!
//! ```rust,ignore
//! use oracle_cursor::{BatchBuilder, Value};
//!
//! let batch = BatchBuilder::new("INSERT INTO users (id, name) VALUES (:1, :2)")
//!     .add_row(vec![Value::Integer(1), Value::String("Alice".to_string())])
//!     .add_row(vec![Value::Integer(1), Value::String("Bob".to_string())])
//!     .with_batch_errors()
//!     .with_row_counts()
//!     .build();
//!
//! let result = cursor.execute_batch(&batch).await?;
//! assert_eq!(result.row_counts.get()?, &[1, 0]);
//! assert_eq!(result.errors[0].offset, 1);
//! ```

use std::time::Duration;

use crate::error::{format_oracle_message, Error, Result};
use crate::row::Value;
use crate::statement::Statement;

/// Options for batch execution
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Whether to continue execution after row errors (batch errors mode)
    pub batch_errors: bool,
    /// Whether to record row counts for each bind row
    pub array_dml_row_counts: bool,
    /// Whether to commit after successful completion
    pub auto_commit: bool,
    /// Deadline for the whole batch
    pub timeout: Option<Duration>,
}

impl BatchOptions {
    /// Create default batch options
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable batch errors mode (continue on errors)
    pub fn with_batch_errors(mut self) -> Self {
        self.batch_errors = true;
        self
    }

    /// Enable array DML row counts
    pub fn with_row_counts(mut self) -> Self {
        self.array_dml_row_counts = true;
        self
    }

    /// Enable auto-commit
    pub fn with_auto_commit(mut self) -> Self {
        self.auto_commit = true;
        self
    }

    /// Bound the batch by a deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A statement together with the rows of bind values to execute it with
#[derive(Debug, Clone)]
pub struct BatchBinds {
    /// Parsed statement information
    pub(crate) statement: Statement,
    /// Rows of bind values (each row is one execution)
    pub(crate) rows: Vec<Vec<Value>>,
    /// Execution options
    pub(crate) options: BatchOptions,
}

impl BatchBinds {
    /// Create a new batch with the given SQL statement
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            statement: Statement::new(sql),
            rows: Vec::new(),
            options: BatchOptions::default(),
        }
    }

    /// Add a row of bind values
    pub fn add_row(&mut self, values: Vec<Value>) -> &mut Self {
        self.rows.push(values);
        self
    }

    /// Set batch execution options
    pub fn with_options(&mut self, options: BatchOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Get the execution options
    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Get the number of rows (executions)
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of bind values each row must supply
    pub fn column_count(&self) -> usize {
        self.statement.arity()
    }

    /// Get the SQL statement
    pub fn sql(&self) -> &str {
        self.statement.sql()
    }

    /// Check if batch is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Validate the statement text and the arity of every row
    ///
    /// Runs before any row is sent, so a mismatch anywhere in the batch
    /// leaves the database untouched.
    pub fn validate(&self) -> Result<()> {
        if self.statement.sql().trim().is_empty() {
            return Err(Error::EmptyStatement);
        }

        for (i, row) in self.rows.iter().enumerate() {
            self.statement.check_binds(i, row)?;
        }

        Ok(())
    }
}

/// Builder for creating batch execution requests
#[derive(Debug)]
pub struct BatchBuilder {
    batch: BatchBinds,
}

impl BatchBuilder {
    /// Create a new batch builder with the given SQL statement
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            batch: BatchBinds::new(sql),
        }
    }

    /// Add a row of bind values
    pub fn add_row(mut self, values: Vec<Value>) -> Self {
        self.batch.add_row(values);
        self
    }

    /// Add multiple rows at once
    pub fn add_rows(mut self, rows: impl IntoIterator<Item = Vec<Value>>) -> Self {
        self.batch.rows.extend(rows);
        self
    }

    /// Enable batch errors mode
    pub fn with_batch_errors(mut self) -> Self {
        self.batch.options.batch_errors = true;
        self
    }

    /// Enable array DML row counts
    pub fn with_row_counts(mut self) -> Self {
        self.batch.options.array_dml_row_counts = true;
        self
    }

    /// Enable auto-commit
    pub fn with_auto_commit(mut self) -> Self {
        self.batch.options.auto_commit = true;
        self
    }

    /// Bound the batch by a deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.batch.options.timeout = Some(timeout);
        self
    }

    /// Build the batch
    pub fn build(self) -> BatchBinds {
        self.batch
    }
}

/// Per-row affected counts, available only when requested
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RowCounts {
    /// Array DML row counts were not enabled
    #[default]
    AccountingDisabled,
    /// One count per bind row, in submission order
    Counted(Vec<u64>),
}

impl RowCounts {
    /// Get the per-row counts
    pub fn get(&self) -> Result<&[u64]> {
        match self {
            RowCounts::Counted(counts) => Ok(counts),
            RowCounts::AccountingDisabled => Err(Error::RowCountsUnavailable),
        }
    }

    /// Check whether counts were recorded
    pub fn is_enabled(&self) -> bool {
        matches!(self, RowCounts::Counted(_))
    }
}

/// Result of batch execution
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    /// Number of rows affected by each bind row (if requested)
    pub row_counts: RowCounts,
    /// Total rows affected by the successful bind rows
    pub total_rows_affected: u64,
    /// Errors encountered (batch errors mode), ordered by offset
    pub errors: Vec<BatchError>,
    /// Number of successful executions
    pub success_count: usize,
    /// Number of failed executions
    pub failure_count: usize,
}

impl BatchResult {
    /// Create a new empty batch result
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if all executions succeeded
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Check if there were any errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Number of bind rows that reached a final state
    pub fn rows_processed(&self) -> usize {
        self.success_count + self.failure_count
    }
}

/// An error reported for a single bind row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchError {
    /// The row offset where the error occurred (0-based)
    pub offset: usize,
    /// Oracle error code
    pub code: u32,
    /// Error message exactly as reported by the database
    pub message: String,
}

impl BatchError {
    /// Create a new batch error
    pub fn new(offset: usize, code: u32, message: impl Into<String>) -> Self {
        Self {
            offset,
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Row {}: {}",
            self.offset,
            format_oracle_message(self.code, &self.message)
        )
    }
}

impl std::error::Error for BatchError {}

impl From<BatchError> for Error {
    fn from(err: BatchError) -> Self {
        Error::RowFailure {
            offset: err.offset,
            code: err.code,
            message: err.message,
        }
    }
}

/// State of one bind row during a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RowState {
    Pending,
    Applied(u64),
    Rejected(BatchError),
}

/// Per-row outcome table, sized to the batch when it starts
#[derive(Debug)]
pub(crate) struct RowOutcomes {
    states: Vec<RowState>,
}

impl RowOutcomes {
    pub(crate) fn new(rows: usize) -> Self {
        Self {
            states: vec![RowState::Pending; rows],
        }
    }

    pub(crate) fn apply(&mut self, offset: usize, rows_affected: u64) {
        self.states[offset] = RowState::Applied(rows_affected);
    }

    pub(crate) fn reject(&mut self, offset: usize, code: u32, message: String) {
        self.states[offset] = RowState::Rejected(BatchError::new(offset, code, message));
    }

    /// Build the outcome for every row that left `Pending`
    ///
    /// Rows are finalized in order, so the finished rows always form a
    /// prefix of the batch. An aborted or timed-out batch yields the outcome
    /// of that prefix.
    pub(crate) fn finish(self, row_counts: bool) -> BatchResult {
        let mut result = BatchResult::new();
        let mut counts = Vec::with_capacity(self.states.len());

        for state in self.states {
            match state {
                RowState::Pending => break,
                RowState::Applied(count) => {
                    counts.push(count);
                    result.total_rows_affected += count;
                    result.success_count += 1;
                }
                RowState::Rejected(err) => {
                    counts.push(0);
                    result.errors.push(err);
                    result.failure_count += 1;
                }
            }
        }

        if row_counts {
            result.row_counts = RowCounts::Counted(counts);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_builder() {
        let batch = BatchBuilder::new("INSERT INTO t (a, b) VALUES (:1, :2)")
            .add_row(vec![Value::Integer(1), Value::String("a".to_string())])
            .add_row(vec![Value::Integer(2), Value::String("b".to_string())])
            .build();

        assert_eq!(batch.row_count(), 2);
        assert_eq!(batch.column_count(), 2);
        assert!(!batch.is_empty());
        assert!(batch.validate().is_ok());
    }

    #[test]
    fn test_batch_validation_empty_rows_is_ok() {
        let batch = BatchBinds::new("INSERT INTO t (a) VALUES (:1)");
        assert!(batch.validate().is_ok());
    }

    #[test]
    fn test_batch_validation_empty_statement() {
        let mut batch = BatchBinds::new("  ");
        batch.add_row(vec![]);
        assert!(matches!(batch.validate(), Err(Error::EmptyStatement)));
    }

    #[test]
    fn test_batch_validation_arity_mismatch() {
        let batch = BatchBuilder::new("INSERT INTO t (a, b) VALUES (:1, :2)")
            .add_row(vec![1.into(), "a".into()])
            .add_row(vec![2.into()])
            .build();

        match batch.validate() {
            Err(Error::ParameterMismatch {
                row,
                expected,
                actual,
            }) => {
                assert_eq!((row, expected, actual), (1, 2, 1));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_batch_options() {
        let opts = BatchOptions::new()
            .with_batch_errors()
            .with_row_counts()
            .with_auto_commit()
            .with_timeout(Duration::from_secs(5));

        assert!(opts.batch_errors);
        assert!(opts.array_dml_row_counts);
        assert!(opts.auto_commit);
        assert_eq!(opts.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_row_counts_disabled() {
        let counts = RowCounts::AccountingDisabled;
        assert!(!counts.is_enabled());
        assert!(matches!(counts.get(), Err(Error::RowCountsUnavailable)));
    }

    #[test]
    fn test_batch_error_display() {
        let err = BatchError::new(5, 1, "test error");
        assert_eq!(err.to_string(), "Row 5: ORA-00001: test error");

        let err = BatchError::new(2, 1, "ORA-00001: unique constraint (T_PK) violated\n");
        assert_eq!(
            err.to_string(),
            "Row 2: ORA-00001: unique constraint (T_PK) violated"
        );
        assert!(err.message.ends_with('\n'));
    }

    #[test]
    fn test_outcomes_finish_keeps_one_count_per_row() {
        let mut outcomes = RowOutcomes::new(5);
        outcomes.apply(0, 1);
        outcomes.apply(1, 1);
        outcomes.reject(2, 1, "dup".to_string());
        outcomes.apply(3, 1);
        outcomes.reject(4, 1438, "precision".to_string());

        let result = outcomes.finish(true);
        assert_eq!(result.row_counts.get().unwrap(), &[1, 1, 0, 1, 0]);
        assert_eq!(result.total_rows_affected, 3);
        let offsets: Vec<_> = result.errors.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![2, 4]);
        assert_eq!(result.success_count, 3);
        assert_eq!(result.failure_count, 2);
    }

    #[test]
    fn test_outcomes_finish_stops_at_pending() {
        let mut outcomes = RowOutcomes::new(4);
        outcomes.apply(0, 2);
        outcomes.apply(1, 3);

        let result = outcomes.finish(true);
        assert_eq!(result.row_counts.get().unwrap(), &[2, 3]);
        assert_eq!(result.rows_processed(), 2);
    }

    #[test]
    fn test_outcomes_aborted_prefix() {
        let mut outcomes = RowOutcomes::new(4);
        outcomes.apply(0, 1);
        outcomes.apply(1, 1);

        let result = outcomes.finish(false);
        assert_eq!(result.row_counts, RowCounts::AccountingDisabled);
        assert_eq!(result.total_rows_affected, 2);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_batch_error_into_row_failure() {
        let err: Error = BatchError::new(3, 1, "dup").into();
        assert!(matches!(
            err,
            Error::RowFailure {
                offset: 3,
                code: 1,
                ..
            }
        ));
    }
}
