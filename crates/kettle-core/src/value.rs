//! Dynamic SQL values.

use crate::Result;
use crate::error::{Error, TypeError};
use crate::types::SqlType;
use chrono::{NaiveDate, NaiveDateTime};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A dynamically-typed SQL value.
///
/// This enum is used for parameter binding, result fetching and as the
/// comparable representation stored in entity snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value
    Null,

    /// Boolean value
    Bool(bool),

    /// 32-bit signed integer
    Int(i32),

    /// 64-bit signed integer
    BigInt(i64),

    /// 64-bit floating point
    Double(f64),

    /// Text string
    Text(String),

    /// Binary data
    Bytes(Vec<u8>),

    /// Calendar date
    Date(NaiveDate),

    /// Date and time without zone
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Check if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::BigInt(_) => "BIGINT",
            Value::Double(_) => "DOUBLE",
            Value::Text(_) => "TEXT",
            Value::Bytes(_) => "BLOB",
            Value::Date(_) => "DATE",
            Value::Timestamp(_) => "TIMESTAMP",
        }
    }

    /// Try to get this value as a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Int(v) => Some(*v != 0),
            Value::BigInt(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Try to get this value as an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            Value::Bool(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Try to get this value as an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(f64::from(*v)),
            Value::BigInt(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get this value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a value read from a driver into the shape expected for
    /// `sql_type`.
    ///
    /// Drivers hand back whatever their storage class is: SQLite returns
    /// dates as text and booleans as integers, generated keys are always
    /// 64-bit. NULL passes through unchanged.
    pub fn coerce(self, sql_type: SqlType) -> Result<Value> {
        let coerced = match (sql_type, self) {
            (_, Value::Null) => Some(Value::Null),
            (SqlType::Integer, Value::Int(v)) => Some(Value::Int(v)),
            (SqlType::Integer, Value::BigInt(v)) => i32::try_from(v).ok().map(Value::Int),
            (SqlType::Integer, Value::Bool(v)) => Some(Value::Int(i32::from(v))),
            (SqlType::BigInt, Value::BigInt(v)) => Some(Value::BigInt(v)),
            (SqlType::BigInt, Value::Int(v)) => Some(Value::BigInt(i64::from(v))),
            (SqlType::BigInt, Value::Bool(v)) => Some(Value::BigInt(i64::from(v))),
            (SqlType::Boolean, v @ (Value::Bool(_) | Value::Int(_) | Value::BigInt(_))) => {
                v.as_bool().map(Value::Bool)
            }
            (SqlType::Double, v @ (Value::Double(_) | Value::Int(_) | Value::BigInt(_))) => {
                v.as_f64().map(Value::Double)
            }
            (SqlType::Text, Value::Text(s)) => Some(Value::Text(s)),
            (SqlType::Blob, Value::Bytes(b)) => Some(Value::Bytes(b)),
            (SqlType::Blob, Value::Text(s)) => Some(Value::Bytes(s.into_bytes())),
            (SqlType::Date, Value::Date(d)) => Some(Value::Date(d)),
            (SqlType::Date, Value::Timestamp(ts)) => Some(Value::Date(ts.date())),
            (SqlType::Date, Value::Text(s)) => parse_date(&s).map(Value::Date),
            (SqlType::Timestamp, Value::Timestamp(ts)) => Some(Value::Timestamp(ts)),
            (SqlType::Timestamp, Value::Date(d)) => {
                d.and_hms_opt(0, 0, 0).map(Value::Timestamp)
            }
            (SqlType::Timestamp, Value::Text(s)) => parse_timestamp(&s).map(Value::Timestamp),
            (_, other) => {
                return Err(Error::Type(TypeError {
                    expected: sql_type.name(),
                    actual: other.type_name().to_string(),
                    column: None,
                }));
            }
        };

        coerced.ok_or_else(|| {
            Error::Type(TypeError {
                expected: sql_type.name(),
                actual: "out of range or malformed value".to_string(),
                column: None,
            })
        })
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .or_else(|| parse_timestamp(s).map(|ts| ts.date()))
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
