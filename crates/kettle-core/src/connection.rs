//! Database connection traits.
//!
//! Drivers implement [`Connection`] for a single live connection and
//! [`Connector`] for opening new ones; the pool and the storage engine only
//! ever see these two traits.

use crate::Result;
use crate::row::Row;
use crate::value::Value;

/// A live database connection.
///
/// All calls are blocking. Parameters are positional and bound by the
/// driver; SQL text never contains interpolated values.
pub trait Connection: Send {
    /// Execute a query and return all rows.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Execute an INSERT and return the key generated for the new row.
    ///
    /// Drivers for databases with `RETURNING` support return the first
    /// column of the first returned row; others report their last insert
    /// id. `None` means no key was generated.
    fn insert(&mut self, sql: &str, params: &[Value]) -> Result<Option<Value>>;

    /// Start a transaction (turns auto-commit off).
    fn begin(&mut self) -> Result<()>;

    /// Commit the current transaction (auto-commit resumes).
    fn commit(&mut self) -> Result<()>;

    /// Roll back the current transaction (auto-commit resumes).
    fn rollback(&mut self) -> Result<()>;

    /// Whether a transaction is currently open on this connection.
    fn in_transaction(&self) -> bool;

    /// Check that the connection is still usable.
    fn is_valid(&mut self) -> bool;

    /// Close the connection. Further calls fail; closing twice is a no-op.
    fn close(&mut self) -> Result<()>;
}

/// Opens new connections for a pool.
pub trait Connector: Send + Sync {
    /// Open a fresh connection.
    fn connect(&self) -> Result<Box<dyn Connection>>;

    /// Human-readable target description for logs (no credentials).
    fn describe(&self) -> String;
}
