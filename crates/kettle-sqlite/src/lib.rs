//! SQLite driver for kettle.
//!
//! Implements the `Connection` and `Connector` traits from kettle-core on
//! top of `rusqlite` (bundled amalgamation).
//!
//! # Example
//!
//! ```rust,ignore
//! use kettle_core::{Connection, Value};
//! use kettle_sqlite::{SqliteConfig, SqliteConnection};
//!
//! let mut conn = SqliteConnection::open(&SqliteConfig::memory())?;
//! conn.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", &[])?;
//! let id = conn.insert("INSERT INTO users (name) VALUES (?)", &[Value::from("Alice")])?;
//! ```
//!
//! # Type Mapping
//!
//! | kettle `Value` | SQLite storage |
//! |----------------|----------------|
//! | `Bool` | INTEGER (0/1) |
//! | `Int`, `BigInt` | INTEGER |
//! | `Double` | REAL |
//! | `Text` | TEXT |
//! | `Bytes` | BLOB |
//! | `Date`, `Timestamp` | TEXT (ISO-8601) |
//!
//! Values read back carry the storage class (`BigInt`, `Double`, `Text`,
//! `Bytes`); the row mapper coerces them to the declared attribute type.

pub mod connection;
pub mod types;

pub use connection::{SqliteConfig, SqliteConnection, SqliteConnector};

/// Version of the linked SQLite library.
pub fn sqlite_version() -> &'static str {
    rusqlite::version()
}

/// Version number of the linked SQLite library.
pub fn sqlite_version_number() -> i32 {
    rusqlite::version_number()
}
