//! Driver constants
//!
//! Oracle type numbers, error codes the cursor layer interprets, and the
//! defaults used by configuration and cursors.

// =============================================================================
// Oracle Data Types
// =============================================================================

/// Oracle data type numbers as reported in column metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum OracleType {
    /// VARCHAR2 string type
    Varchar = 1,
    /// NUMBER type
    Number = 2,
    /// BINARY_INTEGER (PL/SQL)
    BinaryInteger = 3,
    /// DATE type
    Date = 12,
    /// RAW binary type
    Raw = 23,
    /// CHAR fixed-length string
    Char = 96,
    /// BINARY_FLOAT
    BinaryFloat = 100,
    /// BINARY_DOUBLE
    BinaryDouble = 101,
    /// REF CURSOR
    Cursor = 102,
    /// CLOB
    Clob = 112,
    /// BLOB
    Blob = 113,
    /// JSON (21c+)
    Json = 119,
    /// TIMESTAMP
    Timestamp = 180,
    /// BOOLEAN (23c+)
    Boolean = 252,
}

impl OracleType {
    /// Check if this type is a LOB type
    pub fn is_lob(&self) -> bool {
        matches!(self, OracleType::Clob | OracleType::Blob | OracleType::Json)
    }

    /// Check if this type holds numeric data
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            OracleType::Number
                | OracleType::BinaryInteger
                | OracleType::BinaryFloat
                | OracleType::BinaryDouble
        )
    }
}

impl TryFrom<u16> for OracleType {
    type Error = crate::error::Error;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(OracleType::Varchar),
            2 => Ok(OracleType::Number),
            3 => Ok(OracleType::BinaryInteger),
            12 => Ok(OracleType::Date),
            23 => Ok(OracleType::Raw),
            96 => Ok(OracleType::Char),
            100 => Ok(OracleType::BinaryFloat),
            101 => Ok(OracleType::BinaryDouble),
            102 => Ok(OracleType::Cursor),
            112 => Ok(OracleType::Clob),
            113 => Ok(OracleType::Blob),
            119 => Ok(OracleType::Json),
            180 => Ok(OracleType::Timestamp),
            252 => Ok(OracleType::Boolean),
            _ => Err(crate::error::Error::Internal(format!(
                "unknown Oracle type number {}",
                value
            ))),
        }
    }
}

// =============================================================================
// Error Codes
// =============================================================================

/// Oracle error codes interpreted by the driver
#[allow(missing_docs)]
pub mod error_code {
    pub const UNIQUE_CONSTRAINT: u32 = 1;
    pub const SESSION_KILLED: u32 = 28;
    pub const CANNOT_INSERT_NULL: u32 = 1400;
    pub const NO_DATA_FOUND: u32 = 1403;
    pub const CANNOT_UPDATE_TO_NULL: u32 = 1407;
    pub const CHECK_CONSTRAINT: u32 = 2290;
    pub const PARENT_KEY_NOT_FOUND: u32 = 2291;
    pub const CHILD_RECORD_FOUND: u32 = 2292;
    pub const END_OF_FILE_ON_CHANNEL: u32 = 3113;
    pub const CONNECTION_LOST: u32 = 3135;
    pub const SESSION_SHUTDOWN: u32 = 12572;
}

// =============================================================================
// Defaults
// =============================================================================

/// Default number of rows fetched per round trip from a result set
pub const DEFAULT_ARRAYSIZE: usize = 100;

/// Default statement cache size (matches python-oracledb default)
pub const DEFAULT_STMTCACHESIZE: usize = 20;
