//! Bind values and result rows
//!
//! [`Value`] is used in both directions: as a bind value in a batch row and as
//! a column value in a fetched [`Row`]. Typed reads go through [`FromValue`],
//! so `row.try_get::<i64>(0)` reports a conversion failure as an error instead
//! of silently yielding `None`.

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::error::{Error, Result};

/// A bind value or a column value
///
/// Most Rust primitives convert with `.into()`; `None` becomes
/// [`Value::Null`].
///
/// ```rust
/// use oracle_cursor::Value;
///
/// let row: Vec<Value> = vec![1.into(), "First".into(), None::<i64>.into()];
/// assert_eq!(row[0], Value::Integer(1));
/// assert!(row[2].is_null());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Character data (VARCHAR2, CHAR, CLOB)
    String(String),
    /// Binary data (RAW, BLOB)
    Bytes(Vec<u8>),
    /// NUMBER without a fractional part
    Integer(i64),
    /// NUMBER, BINARY_FLOAT or BINARY_DOUBLE
    Float(f64),
    /// BOOLEAN
    Boolean(bool),
    /// DATE or TIMESTAMP
    Timestamp(NaiveDateTime),
    /// JSON
    Json(serde_json::Value),
}

impl Value {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Oracle type family of this value, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::String(_) => "VARCHAR2",
            Value::Bytes(_) => "RAW",
            Value::Integer(_) | Value::Float(_) => "NUMBER",
            Value::Boolean(_) => "BOOLEAN",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::Json(_) => "JSON",
        }
    }

    /// Character data, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// Integral numbers; a float qualifies only when it has no fractional part
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Integer(i) => Some(i),
            Value::Float(f) if f.fract() == 0.0 => Some(f as i64),
            _ => None,
        }
    }

    /// Any number as a float
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float(f) => Some(f),
            Value::Integer(i) => Some(i as f64),
            _ => None,
        }
    }

    /// Binary data, if this is a RAW value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        if let Value::Bytes(b) = self {
            Some(b)
        } else {
            None
        }
    }

    /// Booleans, and numbers read as `0`/non-zero
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Boolean(b) => Some(b),
            Value::Integer(i) => Some(i != 0),
            _ => None,
        }
    }

    /// Date and time, if this is a timestamp
    pub fn as_timestamp(&self) -> Option<&NaiveDateTime> {
        if let Value::Timestamp(ts) = self {
            Some(ts)
        } else {
            None
        }
    }

    /// JSON document, if this is a JSON value
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        if let Value::Json(j) = self {
            Some(j)
        } else {
            None
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => |$v:ident| $conv:expr;)*) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $conv
                }
            }
        )*
    };
}

value_from! {
    i32 => |v| Value::Integer(i64::from(v));
    i64 => |v| Value::Integer(v);
    u32 => |v| Value::Integer(i64::from(v));
    f32 => |v| Value::Float(f64::from(v));
    f64 => |v| Value::Float(v);
    bool => |v| Value::Boolean(v);
    &str => |v| Value::String(v.to_owned());
    String => |v| Value::String(v);
    &[u8] => |v| Value::Bytes(v.to_vec());
    Vec<u8> => |v| Value::Bytes(v);
    NaiveDateTime => |v| Value::Timestamp(v);
    serde_json::Value => |v| Value::Json(v);
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::String(s) => f.write_str(s),
            Value::Bytes(b) => b.iter().try_for_each(|byte| write!(f, "{:02X}", byte)),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.6f")),
            Value::Json(json) => write!(f, "{}", json),
        }
    }
}

/// Conversion from a column value to a Rust type
pub trait FromValue: Sized {
    /// Convert `value`, failing when the types do not match
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch<T>(value: &Value, target: &str) -> Result<T> {
    Err(Error::interface(format!(
        "cannot convert {} value to {}",
        value.kind(),
        target
    )))
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_i64().map_or_else(|| mismatch(value, "i64"), Ok)
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_f64().map_or_else(|| mismatch(value, "f64"), Ok)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_bool().map_or_else(|| mismatch(value, "bool"), Ok)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => mismatch(value, "String"),
            Value::String(s) => Ok(s.clone()),
            other => Ok(other.to_string()),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_timestamp()
            .copied()
            .map_or_else(|| mismatch(value, "NaiveDateTime"), Ok)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

/// A fetched row
///
/// Column names, when present, are shared by every row of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<Value>,
    names: Option<Arc<[String]>>,
}

impl Row {
    /// Row without column names
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values,
            names: None,
        }
    }

    /// Row whose columns can also be looked up by name
    pub fn with_names(values: Vec<Value>, names: impl Into<Arc<[String]>>) -> Self {
        Self {
            values,
            names: Some(names.into()),
        }
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row has no columns
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index` (0-based)
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value of the named column, matched case-insensitively
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let index = self
            .names
            .as_deref()?
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))?;
        self.values.get(index)
    }

    /// Convert the value at `index` to `T`
    pub fn try_get<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self.get(index).ok_or_else(|| {
            Error::interface(format!(
                "column index {} out of range for row of {} columns",
                index,
                self.len()
            ))
        })?;
        T::from_value(value)
    }

    /// All values in column order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Take the values out of the row
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Shorthand for `get(index).and_then(Value::as_str)`
    pub fn get_string(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(Value::as_str)
    }

    /// Shorthand for `get(index).and_then(Value::as_i64)`
    pub fn get_i64(&self, index: usize) -> Option<i64> {
        self.get(index).and_then(Value::as_i64)
    }

    /// Shorthand for `get(index).and_then(Value::as_f64)`
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(Value::as_f64)
    }

    /// True for NULL values and for indexes past the last column
    pub fn is_null(&self, index: usize) -> bool {
        self.get(index).map_or(true, Value::is_null)
    }
}

impl std::ops::Index<usize> for Row {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}
