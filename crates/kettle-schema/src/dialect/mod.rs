//! SQL dialects.
//!
//! A [`Dialect`] is a stateless mapping from semantic column types and
//! parameter positions to vendor syntax. One static instance exists per
//! supported vendor; [`DatabaseType::dialect`] hands it out.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySql;
pub use postgres::Postgres;
pub use sqlite::Sqlite;

use kettle_core::{Error, Result, SqlType};
use std::fmt;
use std::str::FromStr;

/// Vendor-specific SQL syntax.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Lowercase vendor name, as used in connection URLs.
    fn name(&self) -> &'static str;

    /// The vendor this dialect speaks.
    fn database_type(&self) -> DatabaseType;

    /// Column type for a scalar of `sql_type`. `length` applies to text.
    fn column_type(&self, sql_type: SqlType, length: u32) -> String;

    /// Column type for a generated primary key.
    ///
    /// Non-integer keys fall back to [`Dialect::column_type`].
    fn identity_type(&self, sql_type: SqlType, length: u32) -> String {
        self.column_type(sql_type, length)
    }

    /// Positional placeholder for the parameter at `index` (1-based).
    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    /// Clause appended to an INSERT to return the generated key, for
    /// vendors that report keys through a result set.
    fn returning_clause(&self, _pk_column: &str) -> Option<String> {
        None
    }

    /// INSERT for a row whose only column is the generated key.
    fn empty_insert(&self, table: &str) -> String {
        format!("INSERT INTO {table} DEFAULT VALUES")
    }
}

/// Supported database vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseType {
    Postgres,
    MySql,
    Sqlite,
}

impl DatabaseType {
    /// Parse a vendor tag (`postgresql`, `postgres`, `mysql`, `sqlite`).
    ///
    /// Matching ignores ASCII case.
    pub fn parse(tag: &str) -> Result<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(DatabaseType::Postgres),
            "mysql" => Ok(DatabaseType::MySql),
            "sqlite" => Ok(DatabaseType::Sqlite),
            _ => Err(Error::UnsupportedDialect(tag.to_string())),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DatabaseType::Postgres => "postgresql",
            DatabaseType::MySql => "mysql",
            DatabaseType::Sqlite => "sqlite",
        }
    }

    /// The dialect instance for this vendor.
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            DatabaseType::Postgres => &Postgres,
            DatabaseType::MySql => &MySql,
            DatabaseType::Sqlite => &Sqlite,
        }
    }
}

impl FromStr for DatabaseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_vendor_tags() {
        assert_eq!(DatabaseType::parse("postgresql").unwrap(), DatabaseType::Postgres);
        assert_eq!(DatabaseType::parse("postgres").unwrap(), DatabaseType::Postgres);
        assert_eq!(DatabaseType::parse("MySQL").unwrap(), DatabaseType::MySql);
        assert_eq!(DatabaseType::parse("sqlite").unwrap(), DatabaseType::Sqlite);
    }

    #[test]
    fn unknown_vendor_is_rejected() {
        let err = DatabaseType::parse("oracle").unwrap_err();
        assert!(matches!(err, Error::UnsupportedDialect(ref tag) if tag == "oracle"));
        assert_eq!(err.to_string(), "Unsupported database type: oracle");
    }

    #[test]
    fn dialect_round_trip() {
        for ty in [DatabaseType::Postgres, DatabaseType::MySql, DatabaseType::Sqlite] {
            assert_eq!(ty.dialect().database_type(), ty);
            assert_eq!(ty.as_str().parse::<DatabaseType>().unwrap(), ty);
        }
    }

    #[test]
    fn type_mapping_table() {
        let cases = [
            (SqlType::Text, "VARCHAR(40)", "VARCHAR(40)", "VARCHAR(40)"),
            (SqlType::Integer, "INTEGER", "INT", "INTEGER"),
            (SqlType::BigInt, "BIGINT", "BIGINT", "INTEGER"),
            (SqlType::Boolean, "BOOLEAN", "TINYINT(1)", "BOOLEAN"),
            (SqlType::Double, "DOUBLE PRECISION", "DOUBLE", "REAL"),
            (SqlType::Date, "DATE", "DATE", "DATE"),
            (SqlType::Timestamp, "TIMESTAMP", "DATETIME", "TIMESTAMP"),
            (SqlType::Blob, "BYTEA", "BLOB", "BLOB"),
        ];
        for (ty, pg, my, lite) in cases {
            assert_eq!(Postgres.column_type(ty, 40), pg, "{ty:?}");
            assert_eq!(MySql.column_type(ty, 40), my, "{ty:?}");
            assert_eq!(Sqlite.column_type(ty, 40), lite, "{ty:?}");
        }
    }

    #[test]
    fn identity_types() {
        assert_eq!(Postgres.identity_type(SqlType::Integer, 0), "SERIAL");
        assert_eq!(Postgres.identity_type(SqlType::BigInt, 0), "BIGSERIAL");
        assert_eq!(MySql.identity_type(SqlType::Integer, 0), "INT AUTO_INCREMENT");
        assert_eq!(MySql.identity_type(SqlType::BigInt, 0), "BIGINT AUTO_INCREMENT");
        assert_eq!(Sqlite.identity_type(SqlType::BigInt, 0), "INTEGER");
        assert_eq!(Postgres.identity_type(SqlType::Text, 36), "VARCHAR(36)");
    }

    #[test]
    fn placeholders_and_returning() {
        assert_eq!(Postgres.placeholder(3), "$3");
        assert_eq!(MySql.placeholder(3), "?");
        assert_eq!(Sqlite.placeholder(3), "?");
        assert_eq!(Postgres.returning_clause("id").as_deref(), Some("RETURNING id"));
        assert!(MySql.returning_clause("id").is_none());
        assert!(Sqlite.returning_clause("id").is_none());
    }
}
