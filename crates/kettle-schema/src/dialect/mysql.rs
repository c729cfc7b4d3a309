//! MySQL dialect.

use super::{DatabaseType, Dialect};
use kettle_core::SqlType;

/// MySQL: `?` placeholders, `AUTO_INCREMENT` keys read from the last insert id.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::MySql
    }

    fn column_type(&self, sql_type: SqlType, length: u32) -> String {
        match sql_type {
            SqlType::Text => format!("VARCHAR({length})"),
            SqlType::Integer => "INT".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            // MySQL has no real boolean type
            SqlType::Boolean => "TINYINT(1)".to_string(),
            SqlType::Double => "DOUBLE".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Timestamp => "DATETIME".to_string(),
            SqlType::Blob => "BLOB".to_string(),
        }
    }

    fn identity_type(&self, sql_type: SqlType, length: u32) -> String {
        if sql_type.is_integer() {
            format!("{} AUTO_INCREMENT", self.column_type(sql_type, length))
        } else {
            self.column_type(sql_type, length)
        }
    }

    fn empty_insert(&self, table: &str) -> String {
        format!("INSERT INTO {table} () VALUES ()")
    }
}
