//! SQLite dialect.

use super::{DatabaseType, Dialect};
use kettle_core::SqlType;

/// SQLite: `?` placeholders; an `INTEGER PRIMARY KEY` aliases the rowid, so
/// every integer width maps to `INTEGER`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    fn column_type(&self, sql_type: SqlType, length: u32) -> String {
        match sql_type {
            SqlType::Text => format!("VARCHAR({length})"),
            SqlType::Integer | SqlType::BigInt => "INTEGER".to_string(),
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::Double => "REAL".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Timestamp => "TIMESTAMP".to_string(),
            SqlType::Blob => "BLOB".to_string(),
        }
    }
}
