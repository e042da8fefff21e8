//! Error types for the cursor layer
//!
//! This module defines every error a connection or cursor can report, from
//! misuse of the cursor API up to row-level failures reported by the
//! database session.

use std::time::Duration;
use thiserror::Error;

use crate::batch::BatchResult;
use crate::constants::error_code;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the cursor layer
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    // =========================================================================
    // Interface Errors
    // =========================================================================
    /// Statement text is empty or whitespace only
    #[error("statement text is empty")]
    EmptyStatement,

    /// A bind row does not match the number of placeholders in the statement
    #[error("row {row} has {actual} bind values, statement expects {expected}")]
    ParameterMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Row counts were read but array DML row counts were not enabled
    #[error("array DML row counts not enabled for the last execution")]
    RowCountsUnavailable,

    /// Cursor API used in the wrong state
    #[error("interface error: {0}")]
    InterfaceError(String),

    // =========================================================================
    // Connection Errors
    // =========================================================================
    /// Connection already closed
    #[error("connection closed")]
    ConnectionClosed,

    /// Invalid connection string
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),

    // =========================================================================
    // Database Errors
    // =========================================================================
    /// Oracle database error with error code
    #[error("{}", format_oracle_message(*code, message))]
    OracleError { code: u32, message: String },

    /// A batch row failed while batch errors mode was off
    #[error("row {offset}: {}", format_oracle_message(*code, message))]
    RowFailure {
        offset: usize,
        code: u32,
        message: String,
    },

    /// The batch deadline expired before every row was executed
    #[error("batch timed out after {elapsed:?} with {} rows completed", completed.rows_processed())]
    BatchTimeout {
        elapsed: Duration,
        completed: Box<BatchResult>,
    },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (should not happen)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Engines usually prefix their messages with `ORA-NNNNN:`; only add the
/// prefix when the session did not.
pub(crate) fn format_oracle_message(code: u32, message: &str) -> String {
    if message.starts_with("ORA-") {
        message.trim_end().to_string()
    } else {
        format!("ORA-{:05}: {}", code, message.trim_end())
    }
}

impl Error {
    /// Create a new Oracle database error
    pub fn oracle(code: u32, message: impl Into<String>) -> Self {
        Error::OracleError {
            code,
            message: message.into(),
        }
    }

    /// Create a new interface (API misuse) error
    pub fn interface(message: impl Into<String>) -> Self {
        Error::InterfaceError(message.into())
    }

    /// Database error code, if this error came from the database
    pub fn code(&self) -> Option<u32> {
        match self {
            Error::OracleError { code, .. } | Error::RowFailure { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether this error was reported by the database for a single row or
    /// statement, as opposed to a connection or API failure
    pub fn is_row_level(&self) -> bool {
        matches!(self, Error::OracleError { .. }) && !self.is_recoverable()
    }

    /// Split a row-level error into its code and message, handing any other
    /// error back unchanged
    pub(crate) fn into_row_error(self) -> std::result::Result<(u32, String), Error> {
        match self {
            Error::OracleError { code, message } if !is_session_lost(code) => Ok((code, message)),
            other => Err(other),
        }
    }

    /// Check if this is a "no data found" error
    pub fn is_no_data_found(&self) -> bool {
        self.code() == Some(error_code::NO_DATA_FOUND)
    }

    /// Check if this error violates an integrity constraint
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self.code(),
            Some(
                error_code::UNIQUE_CONSTRAINT
                    | error_code::CANNOT_INSERT_NULL
                    | error_code::CANNOT_UPDATE_TO_NULL
                    | error_code::CHECK_CONSTRAINT
                    | error_code::PARENT_KEY_NOT_FOUND
                    | error_code::CHILD_RECORD_FOUND
            )
        )
    }

    /// Check if this error is caused by misuse of the cursor API
    pub fn is_interface_error(&self) -> bool {
        matches!(
            self,
            Error::EmptyStatement
                | Error::ParameterMismatch { .. }
                | Error::RowCountsUnavailable
                | Error::InterfaceError(_)
        )
    }

    /// Check if this is a connection-related error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Error::ConnectionClosed | Error::InvalidConnectionString(_)
        ) || self.is_recoverable()
    }

    /// Check if the session was lost in a way that allows the outcome of the
    /// in-flight transaction to be checked on a new session
    pub fn is_recoverable(&self) -> bool {
        self.code().is_some_and(is_session_lost)
    }
}

fn is_session_lost(code: u32) -> bool {
    matches!(
        code,
        error_code::SESSION_KILLED
            | error_code::END_OF_FILE_ON_CHANNEL
            | error_code::CONNECTION_LOST
            | error_code::SESSION_SHUTDOWN
    )
}
