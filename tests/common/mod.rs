//! In-memory session shared by the integration tests
//!
//! Models the two tables the cursor tests run against:
//!
//! - `TestArrayDML (IntCol number(9) primary key, StringCol varchar2(100), IntCol2 number(3))`
//! - `TestNumbers (IntCol number(9), NumberCol number(9,2))` holding IntCol 1..=10
//!   with NumberCol = IntCol * 1.25
//!
//! Statements are recognized by their leading keywords only, which is enough
//! for the statements the tests issue. Every statement is atomic: a failing
//! execution leaves the table untouched.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use oracle_cursor::{
    ColumnInfo, Config, Connection, Error, Execution, OracleType, Result, ResultSet, Row, Session,
    Statement, Value,
};

pub const INSERT_SQL: &str =
    "insert into TestArrayDML (IntCol, StringCol, IntCol2) values (:1, :2, :3)";

pub const UNIQUE_VIOLATED: &str =
    "ORA-00001: unique constraint (CX_ORACLE.TESTARRAYDML_PK) violated\n";

pub const PRECISION_EXCEEDED: &str =
    "ORA-01438: value larger than specified precision allowed for this column\n";

pub const SESSION_LOST: &str = "ORA-03113: end-of-file on communication channel\n";

/// A row of TestArrayDML
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDmlRow {
    pub int_col: i64,
    pub string_col: Option<String>,
    pub int_col2: Option<i64>,
}

#[derive(Debug, Default)]
struct Tables {
    committed: Vec<ArrayDmlRow>,
    working: Vec<ArrayDmlRow>,
}

/// What the session was asked to do
#[derive(Debug, Default)]
pub struct SessionLog {
    pub prepared: Vec<String>,
    pub executions: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub closed: bool,
}

/// Knobs for simulating a slow or failing server
#[derive(Debug, Clone, Default)]
pub struct Behavior {
    /// Time every execution takes
    pub row_delay: Option<Duration>,
    /// Execution (0-based, counted over the session's lifetime) at which
    /// the session is lost
    pub lose_session_at: Option<usize>,
}

/// Test-side view of a session's tables and log
#[derive(Debug, Clone, Default)]
pub struct Handle {
    tables: Arc<Mutex<Tables>>,
    log: Arc<Mutex<SessionLog>>,
}

impl Handle {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn log(&self) -> MutexGuard<'_, SessionLog> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Rows visible to the session, ordered by IntCol
    pub fn rows(&self) -> Vec<ArrayDmlRow> {
        let mut rows = self.tables().working.clone();
        rows.sort_by_key(|r| r.int_col);
        rows
    }

    /// Rows as of the last commit, ordered by IntCol
    pub fn committed_rows(&self) -> Vec<ArrayDmlRow> {
        let mut rows = self.tables().committed.clone();
        rows.sort_by_key(|r| r.int_col);
        rows
    }

    /// How many times `sql` was prepared
    pub fn prepare_count(&self, sql: &str) -> usize {
        self.log().prepared.iter().filter(|s| s.as_str() == sql).count()
    }
}

/// Forward-only result set over rows computed at execution time
#[derive(Debug)]
pub struct MemoryResultSet {
    columns: Vec<ColumnInfo>,
    rows: VecDeque<Row>,
}

impl MemoryResultSet {
    fn new(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows: rows.into(),
        }
    }
}

impl ResultSet for MemoryResultSet {
    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    async fn fetch(&mut self, max_rows: usize) -> Result<Vec<Row>> {
        let n = max_rows.min(self.rows.len());
        Ok(self.rows.drain(..n).collect())
    }
}

/// Session over the in-memory tables
#[derive(Debug)]
pub struct MemorySession {
    handle: Handle,
    behavior: Behavior,
    next_cursor_id: u16,
}

impl MemorySession {
    pub fn new(behavior: Behavior) -> (Self, Handle) {
        let handle = Handle::default();
        let session = Self {
            handle: handle.clone(),
            behavior,
            next_cursor_id: 1,
        };
        (session, handle)
    }

    fn run(&self, sql: &str, binds: &[Value]) -> Result<Execution<MemoryResultSet>> {
        let normalized = strip_leading_comments(sql)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let mut tables = self.handle.tables();

        if normalized.starts_with("truncate table testarraydml") {
            tables.working.clear();
            tables.committed.clear();
            return Ok(Execution::rows_affected(0));
        }
        if normalized.starts_with("insert into testarraydml") {
            let row = insert_row(&normalized, binds)?;
            if tables.working.iter().any(|r| r.int_col == row.int_col) {
                return Err(Error::oracle(1, UNIQUE_VIOLATED));
            }
            tables.working.push(row);
            return Ok(Execution::rows_affected(1));
        }
        if normalized.starts_with("update testarraydml set ") {
            return update(&mut tables.working, &normalized, binds);
        }
        if normalized.starts_with("delete from testarraydml where ") {
            let (column, _) = predicate(&normalized["delete from testarraydml where ".len()..])?;
            let before = tables.working.len();
            tables.working.retain(|r| r.get(column) != binds[0]);
            let deleted = before - tables.working.len();
            return Ok(Execution::rows_affected(deleted as u64));
        }
        if normalized.starts_with("select count(*) from testarraydml") {
            let count = tables.working.len() as i64;
            return Ok(Execution::query(MemoryResultSet::new(
                vec![ColumnInfo::new("COUNT(*)", OracleType::Number)],
                vec![Row::new(vec![Value::Integer(count)])],
            )));
        }
        if normalized.starts_with("select intcol, stringcol, intcol2 from testarraydml") {
            let mut rows = tables.working.clone();
            rows.sort_by_key(|r| r.int_col);
            return Ok(Execution::query(MemoryResultSet::new(
                array_dml_columns(),
                rows.iter()
                    .map(|r| {
                        Row::new(vec![
                            r.get(Column::IntCol),
                            r.get(Column::StringCol),
                            r.get(Column::IntCol2),
                        ])
                    })
                    .collect(),
            )));
        }
        if normalized.starts_with("declare") || normalized.starts_with("begin") {
            return Ok(Execution::implicit(returned_number_cursors(&normalized)));
        }

        Err(Error::oracle(
            942,
            "ORA-00942: table or view does not exist\n",
        ))
    }
}

impl Session for MemorySession {
    type ResultSet = MemoryResultSet;

    async fn open(_config: &Config) -> Result<Self> {
        Ok(Self::new(Behavior::default()).0)
    }

    async fn prepare(&mut self, statement: &mut Statement) -> Result<()> {
        statement.set_cursor_id(self.next_cursor_id);
        self.next_cursor_id += 1;
        self.handle.log().prepared.push(statement.sql().to_string());
        Ok(())
    }

    async fn execute(
        &mut self,
        statement: &Statement,
        binds: &[Value],
    ) -> Result<Execution<MemoryResultSet>> {
        if statement.cursor_id() == 0 {
            return Err(Error::Internal(
                "statement executed before prepare".to_string(),
            ));
        }

        let index = {
            let mut log = self.handle.log();
            log.executions += 1;
            log.executions - 1
        };
        if let Some(delay) = self.behavior.row_delay {
            tokio::time::sleep(delay).await;
        }
        if self.behavior.lose_session_at == Some(index) {
            return Err(Error::oracle(3113, SESSION_LOST));
        }

        self.run(statement.sql(), binds)
    }

    async fn commit(&mut self) -> Result<()> {
        let mut tables = self.handle.tables();
        tables.committed = tables.working.clone();
        drop(tables);
        self.handle.log().commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let mut tables = self.handle.tables();
        tables.working = tables.committed.clone();
        drop(tables);
        self.handle.log().rollbacks += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.handle.log().closed = true;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    IntCol,
    StringCol,
    IntCol2,
}

fn column(name: &str) -> Result<Column> {
    match name.trim() {
        "intcol" => Ok(Column::IntCol),
        "stringcol" => Ok(Column::StringCol),
        "intcol2" => Ok(Column::IntCol2),
        other => Err(Error::oracle(
            904,
            format!("ORA-00904: \"{}\": invalid identifier\n", other.to_uppercase()),
        )),
    }
}

fn array_dml_columns() -> Vec<ColumnInfo> {
    vec![
        ColumnInfo::new("INTCOL", OracleType::Number).with_precision(9, 0),
        ColumnInfo::new("STRINGCOL", OracleType::Varchar),
        ColumnInfo::new("INTCOL2", OracleType::Number).with_precision(3, 0),
    ]
}

impl ArrayDmlRow {
    fn get(&self, column: Column) -> Value {
        match column {
            Column::IntCol => Value::Integer(self.int_col),
            Column::StringCol => self.string_col.clone().into(),
            Column::IntCol2 => self.int_col2.into(),
        }
    }

    fn set(&mut self, column: Column, value: &Value) -> Result<()> {
        match column {
            Column::IntCol => {
                self.int_col = integer(value)?.ok_or_else(|| {
                    Error::oracle(1407, "ORA-01407: cannot update (\"INTCOL\") to NULL\n")
                })?;
            }
            Column::StringCol => self.string_col = value.as_str().map(str::to_string),
            Column::IntCol2 => self.int_col2 = precision_checked(integer(value)?)?,
        }
        Ok(())
    }
}

fn integer(value: &Value) -> Result<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        Value::Integer(i) => Ok(Some(*i)),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::oracle(1722, "ORA-01722: invalid number\n")),
        _ => Err(Error::oracle(932, "ORA-00932: inconsistent datatypes\n")),
    }
}

/// IntCol2 is number(3)
fn precision_checked(value: Option<i64>) -> Result<Option<i64>> {
    match value {
        Some(v) if v.abs() > 999 => Err(Error::oracle(1438, PRECISION_EXCEEDED)),
        other => Ok(other),
    }
}

fn insert_row(sql: &str, binds: &[Value]) -> Result<ArrayDmlRow> {
    let open = sql.find('(').map(|i| i + 1).unwrap_or(0);
    let close = sql[open..].find(')').map(|i| open + i).unwrap_or(open);

    let mut row = ArrayDmlRow {
        int_col: 0,
        string_col: None,
        int_col2: None,
    };
    let mut has_key = false;
    for (name, value) in sql[open..close].split(',').zip(binds) {
        let column = column(name)?;
        if column == Column::IntCol {
            has_key = !value.is_null();
            if !has_key {
                break;
            }
        }
        row.set(column, value)?;
    }

    if !has_key {
        return Err(Error::oracle(
            1400,
            "ORA-01400: cannot insert NULL into (\"CX_ORACLE\".\"TESTARRAYDML\".\"INTCOL\")\n",
        ));
    }
    Ok(row)
}

/// `<column> = :<n>`
fn predicate(text: &str) -> Result<(Column, &str)> {
    let (name, bind) = text
        .split_once('=')
        .ok_or_else(|| Error::oracle(933, "ORA-00933: SQL command not properly ended\n"))?;
    Ok((column(name)?, bind.trim()))
}

fn update(
    table: &mut Vec<ArrayDmlRow>,
    sql: &str,
    binds: &[Value],
) -> Result<Execution<MemoryResultSet>> {
    let rest = &sql["update testarraydml set ".len()..];
    let (assignment, condition) = rest
        .split_once(" where ")
        .ok_or_else(|| Error::oracle(933, "ORA-00933: SQL command not properly ended\n"))?;
    let (target, _) = predicate(assignment)?;
    let (filter, _) = predicate(condition)?;

    let mut updated = table.clone();
    let mut count = 0;
    for row in updated.iter_mut().filter(|r| r.get(filter) == binds[1]) {
        row.set(target, &binds[0])?;
        count += 1;
    }

    let mut keys: Vec<i64> = updated.iter().map(|r| r.int_col).collect();
    keys.sort_unstable();
    if keys.windows(2).any(|w| w[0] == w[1]) {
        return Err(Error::oracle(1, UNIQUE_VIOLATED));
    }

    *table = updated;
    Ok(Execution::rows_affected(count))
}

/// One result set of TestNumbers.NumberCol per `between <lo> and <hi>`
/// range in the block, in block order
fn returned_number_cursors(block: &str) -> Vec<MemoryResultSet> {
    if !block.contains("dbms_sql.return_result") {
        return Vec::new();
    }

    let mut cursors = Vec::new();
    let mut rest = block;
    while let Some(pos) = rest.find("between ") {
        rest = &rest[pos + "between ".len()..];
        let mut words = rest.split_whitespace();
        let lo = words.next().and_then(|w| w.parse::<i64>().ok());
        let and = words.next();
        let hi = words
            .next()
            .and_then(|w| w.trim_end_matches(';').parse::<i64>().ok());

        if let (Some(lo), Some("and"), Some(hi)) = (lo, and, hi) {
            let rows = (lo.max(1)..=hi.min(10))
                .map(|i| Row::new(vec![Value::Float(i as f64 * 1.25)]))
                .collect();
            cursors.push(MemoryResultSet::new(
                vec![ColumnInfo::new("NUMBERCOL", OracleType::Number).with_precision(9, 2)],
                rows,
            ));
        }
    }
    cursors
}

/// Connection over a fresh in-memory session
pub fn connect() -> (Connection<MemorySession>, Handle) {
    connect_with(Config::default(), Behavior::default())
}

pub fn connect_with(config: Config, behavior: Behavior) -> (Connection<MemorySession>, Handle) {
    let (session, handle) = MemorySession::new(behavior);
    (Connection::from_session(session, config), handle)
}

pub fn array_row(int_col: i64, string_col: &str, int_col2: i64) -> Vec<Value> {
    vec![int_col.into(), string_col.into(), int_col2.into()]
}

fn strip_leading_comments(mut sql: &str) -> &str {
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
