//! Value conversion between kettle and SQLite.
//!
//! SQLite has five storage classes (INTEGER, REAL, TEXT, BLOB, NULL).
//! Dates and timestamps are stored as ISO-8601 text.

use kettle_core::Value;
use rusqlite::types::{Null, ToSql, ToSqlOutput, ValueRef};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Borrowed [`Value`] bindable as a rusqlite parameter.
pub struct SqlParam<'a>(pub &'a Value);

impl ToSql for SqlParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            Value::Null => ToSqlOutput::from(Null),
            Value::Bool(b) => ToSqlOutput::from(*b),
            Value::Int(v) => ToSqlOutput::from(*v),
            Value::BigInt(v) => ToSqlOutput::from(*v),
            Value::Double(v) => ToSqlOutput::from(*v),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Bytes(b) => ToSqlOutput::from(b.as_slice()),
            Value::Date(d) => ToSqlOutput::from(d.format(DATE_FORMAT).to_string()),
            Value::Timestamp(ts) => ToSqlOutput::from(ts.format(TIMESTAMP_FORMAT).to_string()),
        })
    }
}

/// Convert a column value read from SQLite.
pub fn from_sqlite(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::BigInt(v),
        ValueRef::Real(v) => Value::Double(v),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use kettle_core::SqlType;

    fn output(value: &Value) -> rusqlite::types::Value {
        match SqlParam(value).to_sql().unwrap() {
            ToSqlOutput::Owned(v) => v,
            ToSqlOutput::Borrowed(v) => v.into(),
            _ => panic!("unexpected output"),
        }
    }

    #[test]
    fn dates_bind_as_iso_text() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            output(&Value::Date(date)),
            rusqlite::types::Value::Text("2024-02-29".into())
        );
        let ts = date.and_hms_opt(13, 5, 9).unwrap();
        let text = match output(&Value::Timestamp(ts)) {
            rusqlite::types::Value::Text(t) => t,
            other => panic!("expected text, got {other:?}"),
        };
        assert_eq!(
            Value::Text(text).coerce(SqlType::Timestamp).unwrap(),
            Value::Timestamp(ts)
        );
    }

    #[test]
    fn booleans_bind_as_integers() {
        assert_eq!(output(&Value::Bool(true)), rusqlite::types::Value::Integer(1));
        assert_eq!(output(&Value::Null), rusqlite::types::Value::Null);
    }

    #[test]
    fn storage_classes_read_back() {
        assert_eq!(from_sqlite(ValueRef::Integer(7)), Value::BigInt(7));
        assert_eq!(from_sqlite(ValueRef::Real(1.5)), Value::Double(1.5));
        assert_eq!(from_sqlite(ValueRef::Text(b"hi")), Value::Text("hi".into()));
        assert_eq!(from_sqlite(ValueRef::Null), Value::Null);
    }
}
