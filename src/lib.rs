#![warn(missing_docs)]

//! # oracle-cursor
//!
//! Cursor-level batch execution for Oracle client sessions.
//!
//! The crate sits on top of a database [`Session`] (the client library that
//! talks to the server) and exposes the familiar connection/cursor API, with
//! the focus on executing one statement against many rows of bind values and
//! reporting the outcome of every row.
//!
//! ## Features
//!
//! - **Batch DML** - `execute_many` with per-row affected counts and batch
//!   errors
//! - **Implicit results** - result sets returned by PL/SQL blocks, handed
//!   over as independent forward-only handles
//! - **Statement Caching** - LRU cache for prepared statements
//! - **Async/await** - Built on Tokio
//!
//! ## Batch Operations
//!
//! ```rust,ignore
//! use oracle_cursor::{BatchOptions, Connection};
//!
//! # async fn example(conn: Connection<MySession>) -> oracle_cursor::Result<()> {
//! let mut cursor = conn.cursor()?;
//! let rows = vec![
//!     vec![1.into(), "First".into(), 100.into()],
//!     vec![2.into(), "Second".into(), 200.into()],
//!     vec![2.into(), "Third".into(), 300.into()],
//! ];
//!
//! let outcome = cursor
//!     .execute_many(
//!         "insert into TestArrayDML (IntCol, StringCol, IntCol2) values (:1, :2, :3)",
//!         rows,
//!         BatchOptions::new().with_batch_errors().with_row_counts(),
//!     )
//!     .await?;
//!
//! assert_eq!(outcome.row_counts.get()?, &[1, 1, 0]);
//! assert_eq!(outcome.errors[0].offset, 2);
//! assert_eq!(cursor.row_count(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Implicit Results
//!
//! ```rust,ignore
//! cursor.execute(r#"
//!     declare
//!         c1 sys_refcursor;
//!     begin
//!         open c1 for select NumberCol from TestNumbers where IntCol between 3 and 5;
//!         dbms_sql.return_result(c1);
//!     end;"#, &[]).await?;
//!
//! for result in cursor.implicit_results()? {
//!     let rows = result.fetch_all().await?;
//! }
//! ```
//!
//! ## Sessions
//!
//! A concrete client implements [`Session`] and [`ResultSet`]. Row-level
//! failures must be reported as [`Error::OracleError`] so that batches can
//! collect them instead of aborting.

pub mod batch;
pub mod config;
pub mod connection;
pub mod constants;
pub mod cursor;
pub mod error;
pub mod implicit;
pub mod row;
pub mod session;
pub mod statement;
pub mod statement_cache;

// Re-export commonly used types
pub use batch::{BatchBinds, BatchBuilder, BatchError, BatchOptions, BatchResult, RowCounts};
pub use config::{Config, ServiceMethod};
pub use connection::{Connection, ConnectionState};
pub use constants::OracleType;
pub use cursor::Cursor;
pub use error::{Error, Result};
pub use implicit::ImplicitResult;
pub use row::{FromValue, Row, Value};
pub use session::{Execution, ResultSet, Session};
pub use statement::{BindInfo, ColumnInfo, Statement, StatementType};
pub use statement_cache::StatementCache;

// Re-export serde_json for users working with JSON values
pub use serde_json;
