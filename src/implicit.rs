//! Implicit results support for Oracle PL/SQL blocks
//!
//! Oracle 12.1+ lets a PL/SQL block return result sets to its caller with
//! `dbms_sql.return_result()`. After executing such a block,
//! [`Cursor::implicit_results`](crate::Cursor::implicit_results) hands the
//! result sets over as independent [`ImplicitResult`] handles, in the order
//! the block returned them.
//!
//! # Example
//!
//! ```rust,ignore
//! cursor.execute(r#"
//!     declare
//!         c1 sys_refcursor;
//!         c2 sys_refcursor;
//!     begin
//!         open c1 for select * from employees;
//!         dbms_sql.return_result(c1);
//!
//!         open c2 for select * from departments;
//!         dbms_sql.return_result(c2);
//!     end;
//! "#, &[]).await?;
//!
//! for (i, mut result) in cursor.implicit_results()?.into_iter().enumerate() {
//!     println!("Result set #{}", i + 1);
//!     while let Some(row) = result.next_row().await? {
//!         println!("{:?}", row);
//!     }
//! }
//! ```

use std::collections::VecDeque;

use futures_core::Stream;

use crate::error::Result;
use crate::row::Row;
use crate::session::ResultSet;
use crate::statement::ColumnInfo;

/// One implicit result set returned by a PL/SQL block
///
/// Rows are fetched lazily from the session, `array_size` rows per round
/// trip. The sequence is forward-only: once a row has been yielded it cannot
/// be read again, and an exhausted result stays exhausted.
#[derive(Debug)]
pub struct ImplicitResult<R> {
    /// Position among the block's result sets (0-based)
    index: usize,
    /// Column metadata
    columns: Vec<ColumnInfo>,
    /// Server-side result set, dropped once it reports no more rows
    source: Option<R>,
    /// Rows fetched but not yet yielded
    buffer: VecDeque<Row>,
    /// Rows requested per fetch
    array_size: usize,
}

impl<R: ResultSet> ImplicitResult<R> {
    pub(crate) fn new(index: usize, source: R, array_size: usize) -> Self {
        Self {
            index,
            columns: source.columns().to_vec(),
            source: Some(source),
            buffer: VecDeque::new(),
            array_size: array_size.max(1),
        }
    }

    /// Position of this result set in the order the block returned them
    pub fn index(&self) -> usize {
        self.index
    }

    /// Column metadata
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Check whether every row has been yielded
    pub fn is_exhausted(&self) -> bool {
        self.source.is_none() && self.buffer.is_empty()
    }

    /// Yield the next row, fetching from the session when the local buffer
    /// runs dry
    pub async fn next_row(&mut self) -> Result<Option<Row>> {
        if let Some(row) = self.buffer.pop_front() {
            return Ok(Some(row));
        }

        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };

        let rows = source.fetch(self.array_size).await?;
        tracing::trace!(
            result_set = self.index,
            fetched = rows.len(),
            "Fetched implicit result rows"
        );

        if rows.is_empty() {
            self.source = None;
            return Ok(None);
        }
        self.buffer.extend(rows);
        Ok(self.buffer.pop_front())
    }

    /// Consume the result set and collect the remaining rows
    pub async fn fetch_all(mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Consume the result set as a stream of rows
    pub fn into_stream(mut self) -> impl Stream<Item = Result<Row>> + Send {
        async_stream::try_stream! {
            while let Some(row) = self.next_row().await? {
                yield row;
            }
        }
    }
}
