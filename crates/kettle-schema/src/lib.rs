//! SQL generation for kettle.
//!
//! This crate provides:
//! - `Dialect` implementations for PostgreSQL, MySQL and SQLite
//! - `CREATE TABLE` generation from resolved entity metadata
//! - parameterized INSERT / UPDATE / DELETE / primary-key SELECT builders

pub mod create;
pub mod dialect;
pub mod statement;

#[cfg(test)]
mod fixtures;

pub use create::create_table;
pub use dialect::{DatabaseType, Dialect, MySql, Postgres, Sqlite};
pub use statement::Statement;
