//! Database session contract
//!
//! The cursor layer never speaks a wire protocol itself. A [`Session`] is the
//! client library underneath it: it prepares and executes statements, reports
//! affected-row counts and structured errors, and hands back result sets,
//! including the implicit result sets a PL/SQL block returns with
//! `dbms_sql.return_result`.
//!
//! Row-level failures (constraint violations, precision overflow, ...) must be
//! reported as [`Error::OracleError`](crate::Error::OracleError) so that the
//! batch executor can tell them apart from connection failures.

use std::future::Future;

use crate::config::Config;
use crate::error::Result;
use crate::row::{Row, Value};
use crate::statement::{ColumnInfo, Statement};

/// A forward-only server-side result set
pub trait ResultSet: Send {
    /// Column metadata for the rows this result set yields
    fn columns(&self) -> &[ColumnInfo];

    /// Fetch up to `max_rows` rows. An empty vector means the result set is
    /// exhausted.
    fn fetch(&mut self, max_rows: usize) -> impl Future<Output = Result<Vec<Row>>> + Send;
}

/// Outcome of a single statement execution reported by a session
#[derive(Debug)]
pub struct Execution<R> {
    /// Rows inserted, updated or deleted
    pub rows_affected: u64,
    /// Result set of a query
    pub result_set: Option<R>,
    /// Result sets returned implicitly by a PL/SQL block, in the order the
    /// block returned them
    pub implicit_results: Vec<R>,
}

impl<R> Execution<R> {
    /// Execution of a DML or DDL statement
    pub fn rows_affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            result_set: None,
            implicit_results: Vec::new(),
        }
    }

    /// Execution of a query
    pub fn query(result_set: R) -> Self {
        Self {
            rows_affected: 0,
            result_set: Some(result_set),
            implicit_results: Vec::new(),
        }
    }

    /// Execution of a PL/SQL block that returned implicit result sets
    pub fn implicit(implicit_results: Vec<R>) -> Self {
        Self {
            rows_affected: 0,
            result_set: None,
            implicit_results,
        }
    }
}

/// An open session with the database
pub trait Session: Send + Sized {
    /// Result set type produced by this session
    type ResultSet: ResultSet;

    /// Open a session described by `config`
    fn open(config: &Config) -> impl Future<Output = Result<Self>> + Send;

    /// Prepare a statement, assigning it a cursor id
    fn prepare(&mut self, statement: &mut Statement) -> impl Future<Output = Result<()>> + Send;

    /// Execute a prepared statement once with one row of bind values
    fn execute(
        &mut self,
        statement: &Statement,
        binds: &[Value],
    ) -> impl Future<Output = Result<Execution<Self::ResultSet>>> + Send;

    /// Commit the current transaction
    fn commit(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Roll back the current transaction
    fn rollback(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Close the session
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}
