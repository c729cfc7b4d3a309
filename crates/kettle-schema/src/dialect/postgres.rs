//! PostgreSQL dialect.

use super::{DatabaseType, Dialect};
use kettle_core::SqlType;

/// PostgreSQL: `$n` placeholders, `SERIAL` keys, keys returned via `RETURNING`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    fn column_type(&self, sql_type: SqlType, length: u32) -> String {
        match sql_type {
            SqlType::Text => format!("VARCHAR({length})"),
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::Double => "DOUBLE PRECISION".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Timestamp => "TIMESTAMP".to_string(),
            SqlType::Blob => "BYTEA".to_string(),
        }
    }

    fn identity_type(&self, sql_type: SqlType, length: u32) -> String {
        match sql_type {
            SqlType::Integer => "SERIAL".to_string(),
            SqlType::BigInt => "BIGSERIAL".to_string(),
            other => self.column_type(other, length),
        }
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn returning_clause(&self, pk_column: &str) -> Option<String> {
        Some(format!("RETURNING {pk_column}"))
    }
}
