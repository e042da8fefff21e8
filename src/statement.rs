//! SQL statement classification and placeholder extraction
//!
//! The database session does the real parsing; the client only needs to know
//! what kind of statement it holds and how many bind values each execution
//! must supply.

use crate::constants::OracleType;
use crate::error::{Error, Result};
use crate::row::Value;

/// Statement type determined by the leading keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementType {
    /// Unknown or unparsed statement
    #[default]
    Unknown,
    /// SELECT query
    Query,
    /// DML: INSERT, UPDATE, DELETE, MERGE
    Dml,
    /// DDL: CREATE, ALTER, DROP, etc.
    Ddl,
    /// PL/SQL block: BEGIN, DECLARE, CALL
    PlSql,
}

/// A bind placeholder found in the statement text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindInfo {
    /// Placeholder name without the leading colon (`1`, `NAME`, or a quoted name)
    pub name: String,
    /// Whether this placeholder follows RETURNING ... INTO
    pub is_return_bind: bool,
}

impl BindInfo {
    /// Create a new bind placeholder with the given name
    pub fn new(name: impl Into<String>, is_return_bind: bool) -> Self {
        Self {
            name: name.into(),
            is_return_bind,
        }
    }
}

/// Metadata for a column in a result set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// Oracle data type
    pub oracle_type: OracleType,
    /// Precision (for NUMBER)
    pub precision: i16,
    /// Scale (for NUMBER)
    pub scale: i16,
    /// Whether NULL values are allowed
    pub nullable: bool,
}

impl ColumnInfo {
    /// Create a new column with minimal info
    pub fn new(name: impl Into<String>, oracle_type: OracleType) -> Self {
        Self {
            name: name.into(),
            oracle_type,
            precision: 0,
            scale: 0,
            nullable: true,
        }
    }

    /// Set NUMBER precision and scale
    pub fn with_precision(mut self, precision: i16, scale: i16) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }
}

/// A classified SQL statement
///
/// A `Statement` is immutable apart from the cursor id the session assigns
/// when it prepares it, which lets the connection reuse one prepared
/// statement across many executions.
#[derive(Debug, Clone)]
pub struct Statement {
    /// The original SQL text
    sql: String,
    /// Statement type
    statement_type: StatementType,
    /// Cursor ID assigned by the session (0 = not yet prepared)
    cursor_id: u16,
    /// Bind placeholders in order of appearance
    bind_info_list: Vec<BindInfo>,
    /// Whether this is a DML RETURNING statement
    is_returning: bool,
}

impl Statement {
    /// Create a new statement from SQL text
    pub fn new(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let statement_type = classify(&sql);
        let (bind_info_list, is_returning) = if statement_type == StatementType::Ddl {
            (Vec::new(), false)
        } else {
            scan_placeholders(&sql, statement_type)
        };

        Self {
            sql,
            statement_type,
            cursor_id: 0,
            bind_info_list,
            is_returning,
        }
    }

    /// Get the SQL text
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Get the statement type
    pub fn statement_type(&self) -> StatementType {
        self.statement_type
    }

    /// Check if this is a query (SELECT)
    pub fn is_query(&self) -> bool {
        self.statement_type == StatementType::Query
    }

    /// Check if this is a DML statement
    pub fn is_dml(&self) -> bool {
        self.statement_type == StatementType::Dml
    }

    /// Check if this is a DDL statement
    pub fn is_ddl(&self) -> bool {
        self.statement_type == StatementType::Ddl
    }

    /// Check if this is a PL/SQL block
    pub fn is_plsql(&self) -> bool {
        self.statement_type == StatementType::PlSql
    }

    /// Check if this is a RETURNING statement
    pub fn is_returning(&self) -> bool {
        self.is_returning
    }

    /// Get the cursor ID
    pub fn cursor_id(&self) -> u16 {
        self.cursor_id
    }

    /// Set the cursor ID
    pub fn set_cursor_id(&mut self, id: u16) {
        self.cursor_id = id;
    }

    /// Get the bind placeholders
    pub fn bind_info(&self) -> &[BindInfo] {
        &self.bind_info_list
    }

    /// Number of bind values each execution must supply
    pub fn arity(&self) -> usize {
        self.bind_info_list.len()
    }

    /// Check one row of bind values against the statement arity
    pub fn check_binds(&self, row: usize, values: &[Value]) -> Result<()> {
        if values.len() != self.arity() {
            return Err(Error::ParameterMismatch {
                row,
                expected: self.arity(),
                actual: values.len(),
            });
        }
        Ok(())
    }
}

/// Text after any leading whitespace and comments
fn skip_leading_comments(mut sql: &str) -> &str {
    loop {
        sql = sql.trim_start();
        if let Some(rest) = sql.strip_prefix("--") {
            sql = rest.split_once('\n').map_or("", |(_, after)| after);
        } else if let Some(rest) = sql.strip_prefix("/*") {
            sql = rest.split_once("*/").map_or("", |(_, after)| after);
        } else {
            return sql;
        }
    }
}

fn classify(sql: &str) -> StatementType {
    let first_word: String = skip_leading_comments(sql)
        .chars()
        .take_while(|c| c.is_alphabetic())
        .collect();

    match first_word.to_ascii_uppercase().as_str() {
        "SELECT" | "WITH" => StatementType::Query,
        "INSERT" | "UPDATE" | "DELETE" | "MERGE" => StatementType::Dml,
        "CREATE" | "ALTER" | "DROP" | "GRANT" | "REVOKE" | "ANALYZE" | "AUDIT" | "COMMENT"
        | "TRUNCATE" => StatementType::Ddl,
        "DECLARE" | "BEGIN" | "CALL" => StatementType::PlSql,
        _ => StatementType::Unknown,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Code,
    StringLiteral,
    QuotedIdentifier,
    LineComment,
    BlockComment,
}

/// Collect placeholders outside literals and comments.
///
/// PL/SQL binds by name, so repeated names collapse into one placeholder;
/// SQL binds by position, so every occurrence counts.
fn scan_placeholders(sql: &str, statement_type: StatementType) -> (Vec<BindInfo>, bool) {
    let chars: Vec<char> = sql.chars().collect();
    let len = chars.len();
    let mut binds: Vec<BindInfo> = Vec::new();
    let mut state = ScanState::Code;
    let mut returning_found = false;
    let mut into_found = false;
    let mut i = 0;

    while i < len {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();

        match state {
            ScanState::StringLiteral => {
                if ch == '\'' {
                    state = ScanState::Code;
                }
                i += 1;
            }
            ScanState::QuotedIdentifier => {
                if ch == '"' {
                    state = ScanState::Code;
                }
                i += 1;
            }
            ScanState::LineComment => {
                if ch == '\n' {
                    state = ScanState::Code;
                }
                i += 1;
            }
            ScanState::BlockComment => {
                if ch == '*' && next == Some('/') {
                    state = ScanState::Code;
                    i += 2;
                } else {
                    i += 1;
                }
            }
            ScanState::Code => {
                if ch == '\'' {
                    state = ScanState::StringLiteral;
                    i += 1;
                } else if ch == '"' {
                    state = ScanState::QuotedIdentifier;
                    i += 1;
                } else if ch == '-' && next == Some('-') {
                    state = ScanState::LineComment;
                    i += 2;
                } else if ch == '/' && next == Some('*') {
                    state = ScanState::BlockComment;
                    i += 2;
                } else if statement_type == StatementType::Dml
                    && !returning_found
                    && keyword_at(&chars, i, "RETURNING")
                {
                    returning_found = true;
                    i += "RETURNING".len();
                } else if returning_found && !into_found && keyword_at(&chars, i, "INTO") {
                    into_found = true;
                    i += "INTO".len();
                } else if ch == ':' {
                    match bind_name_at(&chars, i + 1) {
                        Some((name, consumed)) => {
                            let duplicate = statement_type == StatementType::PlSql
                                && binds.iter().any(|b| b.name == name);
                            if !duplicate {
                                binds.push(BindInfo::new(name, into_found));
                            }
                            i += 1 + consumed;
                        }
                        None => i += 1,
                    }
                } else {
                    i += 1;
                }
            }
        }
    }

    (binds, into_found)
}

/// Case-insensitive keyword match bounded by non-identifier characters
fn keyword_at(chars: &[char], pos: usize, keyword: &str) -> bool {
    let end = pos + keyword.len();
    if end > chars.len() {
        return false;
    }
    if pos > 0 && chars[pos - 1].is_alphanumeric() {
        return false;
    }
    if end < chars.len() && chars[end].is_alphanumeric() {
        return false;
    }
    chars[pos..end]
        .iter()
        .zip(keyword.chars())
        .all(|(c, k)| c.to_ascii_uppercase() == k)
}

/// Read a bind name following a colon; returns the name and the number of
/// characters consumed after the colon
fn bind_name_at(chars: &[char], start: usize) -> Option<(String, usize)> {
    let len = chars.len();
    let mut i = start;
    while i < len && chars[i].is_whitespace() {
        i += 1;
    }
    let first = *chars.get(i)?;

    if first == '"' {
        let name_start = i + 1;
        let mut end = name_start;
        while end < len && chars[end] != '"' {
            end += 1;
        }
        if end == name_start || end == len {
            return None;
        }
        let name: String = chars[name_start..end].iter().collect();
        return Some((name, end + 1 - start));
    }

    if first.is_ascii_digit() {
        let mut end = i;
        while end < len && chars[end].is_ascii_digit() {
            end += 1;
        }
        let name: String = chars[i..end].iter().collect();
        return Some((name, end - start));
    }

    // `:=` and friends are not binds
    if !first.is_alphabetic() {
        return None;
    }

    let mut end = i;
    while end < len && (chars[end].is_alphanumeric() || matches!(chars[end], '_' | '$' | '#')) {
        end += 1;
    }
    let name = chars[i..end].iter().collect::<String>().to_uppercase();
    Some((name, end - start))
}
