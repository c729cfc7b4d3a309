//! SQLite connection implementation.

use crate::types::{SqlParam, from_sqlite};
use kettle_core::error::{ConnectionError, ConnectionErrorKind, QueryError, QueryErrorKind};
use kettle_core::{ColumnInfo, Connection, Connector, Error, Result, Row, Value};
use rusqlite::ErrorCode;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for opening SQLite connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    /// Path to the database file, or ":memory:" for in-memory database.
    pub path: String,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
    /// Enforce foreign-key constraints (`PRAGMA foreign_keys`).
    pub foreign_keys: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            busy_timeout_ms: 5000,
            foreign_keys: true,
        }
    }
}

impl SqliteConfig {
    /// Create a new config for a file-based database.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create a new config for an in-memory database.
    ///
    /// Every connection opened from this config gets its own, separate
    /// database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Set busy timeout.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    /// Enable/disable foreign-key enforcement.
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    fn is_memory(&self) -> bool {
        self.path == ":memory:"
    }
}

/// A connection to a SQLite database.
pub struct SqliteConnection {
    /// `None` once closed
    conn: Option<rusqlite::Connection>,
    path: String,
}

impl SqliteConnection {
    /// Open a new SQLite connection with the given configuration.
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        let conn = if config.is_memory() {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&config.path)
        }
        .map_err(|e| connect_error(format!("Failed to open database {}", config.path), e))?;

        if config.busy_timeout_ms > 0 {
            conn.busy_timeout(Duration::from_millis(u64::from(config.busy_timeout_ms)))
                .map_err(|e| connect_error("Failed to set busy timeout".to_string(), e))?;
        }
        if config.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON")
                .map_err(|e| connect_error("Failed to enable foreign keys".to_string(), e))?;
        }

        tracing::debug!(path = %config.path, "Opened SQLite connection");
        Ok(Self {
            conn: Some(conn),
            path: config.path.clone(),
        })
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::open(&SqliteConfig::memory())
    }

    /// Open a file-based database.
    pub fn open_file(path: impl Into<String>) -> Result<Self> {
        Self::open(&SqliteConfig::file(path))
    }

    /// Get the database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Execute one or more `;`-separated statements without parameters.
    pub fn execute_raw(&mut self, sql: &str) -> Result<()> {
        self.handle()?
            .execute_batch(sql)
            .map_err(|e| query_error(sql, e))
    }

    fn handle(&mut self) -> Result<&mut rusqlite::Connection> {
        self.conn.as_mut().ok_or_else(|| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Disconnected,
                message: "connection is closed".to_string(),
                source: None,
            })
        })
    }
}

impl Connection for SqliteConnection {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        tracing::trace!(sql = %sql, params = params.len(), "SQLite query");
        let conn = self.handle()?;
        let mut stmt = conn.prepare(sql).map_err(|e| query_error(sql, e))?;
        let columns = Arc::new(ColumnInfo::new(
            stmt.column_names().into_iter().map(String::from).collect(),
        ));
        let width = columns.len();

        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter().map(SqlParam)))
            .map_err(|e| query_error(sql, e))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next().map_err(|e| query_error(sql, e))? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                let value = row.get_ref(i).map_err(|e| query_error(sql, e))?;
                values.push(from_sqlite(value));
            }
            result.push(Row::with_columns(Arc::clone(&columns), values));
        }
        Ok(result)
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        tracing::trace!(sql = %sql, params = params.len(), "SQLite execute");
        let changed = self
            .handle()?
            .execute(sql, rusqlite::params_from_iter(params.iter().map(SqlParam)))
            .map_err(|e| query_error(sql, e))?;
        Ok(changed as u64)
    }

    fn insert(&mut self, sql: &str, params: &[Value]) -> Result<Option<Value>> {
        let changed = self.execute(sql, params)?;
        if changed == 0 {
            return Ok(None);
        }
        Ok(Some(Value::BigInt(self.handle()?.last_insert_rowid())))
    }

    fn begin(&mut self) -> Result<()> {
        self.execute_raw("BEGIN")
    }

    fn commit(&mut self) -> Result<()> {
        self.execute_raw("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        self.execute_raw("ROLLBACK")
    }

    fn in_transaction(&self) -> bool {
        self.conn.as_ref().is_some_and(|c| !c.is_autocommit())
    }

    fn is_valid(&mut self) -> bool {
        match self.conn.as_ref() {
            Some(conn) => conn
                .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .is_ok(),
            None => false,
        }
    }

    fn close(&mut self) -> Result<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        conn.close().map_err(|(_, e)| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Disconnected,
                message: format!("Failed to close database {}: {}", self.path, e),
                source: Some(Box::new(e)),
            })
        })
    }
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .field("open", &self.conn.is_some())
            .finish()
    }
}

/// Opens [`SqliteConnection`]s for a pool.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    config: SqliteConfig,
}

impl SqliteConnector {
    pub fn new(config: SqliteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }
}

impl Connector for SqliteConnector {
    fn connect(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(SqliteConnection::open(&self.config)?))
    }

    fn describe(&self) -> String {
        format!("sqlite://{}", self.config.path)
    }
}

fn connect_error(message: String, e: rusqlite::Error) -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::Connect,
        message: format!("{message}: {e}"),
        source: Some(Box::new(e)),
    })
}

fn query_error(sql: &str, e: rusqlite::Error) -> Error {
    let kind = match e.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => QueryErrorKind::Constraint,
        _ if e.to_string().contains("syntax error") => QueryErrorKind::Syntax,
        _ => QueryErrorKind::Database,
    };
    Error::Query(QueryError {
        kind,
        sql: Some(sql.to_string()),
        message: e.to_string(),
        source: Some(Box::new(e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> SqliteConnection {
        let mut conn = SqliteConnection::open_memory().unwrap();
        conn.execute_raw(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(32) UNIQUE, born DATE)",
        )
        .unwrap();
        conn
    }

    #[test]
    fn insert_returns_rowid() {
        let mut conn = memory();
        let id = conn
            .insert("INSERT INTO users (name) VALUES (?)", &[Value::from("alice")])
            .unwrap();
        assert_eq!(id, Some(Value::BigInt(1)));
        let id = conn
            .insert("INSERT INTO users (name) VALUES (?)", &[Value::from("bob")])
            .unwrap();
        assert_eq!(id, Some(Value::BigInt(2)));
    }

    #[test]
    fn query_maps_columns_by_name() {
        let mut conn = memory();
        conn.execute(
            "INSERT INTO users (name, born) VALUES (?, ?)",
            &[Value::from("alice"), Value::from("1990-05-01")],
        )
        .unwrap();
        let rows = conn
            .query("SELECT * FROM users WHERE name = ?", &[Value::from("alice")])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_by_name("NAME"), Some(&Value::Text("alice".into())));
        assert_eq!(rows[0].get_by_name("id"), Some(&Value::BigInt(1)));
    }

    #[test]
    fn constraint_violation_kind() {
        let mut conn = memory();
        conn.execute("INSERT INTO users (name) VALUES ('a')", &[])
            .unwrap();
        let err = conn
            .execute("INSERT INTO users (name) VALUES ('a')", &[])
            .unwrap_err();
        match err {
            Error::Query(q) => {
                assert_eq!(q.kind, QueryErrorKind::Constraint);
                assert!(q.sql.unwrap().starts_with("INSERT"));
            }
            other => panic!("expected query error, got {other:?}"),
        }
    }

    #[test]
    fn syntax_error_kind() {
        let mut conn = memory();
        let err = conn.query("SELEC 1", &[]).unwrap_err();
        assert!(matches!(
            err,
            Error::Query(QueryError {
                kind: QueryErrorKind::Syntax,
                ..
            })
        ));
    }

    #[test]
    fn transaction_state_and_rollback() {
        let mut conn = memory();
        assert!(!conn.in_transaction());
        conn.begin().unwrap();
        assert!(conn.in_transaction());
        conn.execute("INSERT INTO users (name) VALUES ('tmp')", &[])
            .unwrap();
        conn.rollback().unwrap();
        assert!(!conn.in_transaction());
        assert!(conn.query("SELECT * FROM users", &[]).unwrap().is_empty());
    }

    #[test]
    fn closed_connection_is_invalid() {
        let mut conn = memory();
        assert!(conn.is_valid());
        conn.close().unwrap();
        conn.close().unwrap();
        assert!(!conn.is_valid());
        assert!(matches!(
            conn.query("SELECT 1", &[]),
            Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Disconnected,
                ..
            }))
        ));
    }

    #[test]
    fn connector_enforces_foreign_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fk.db");
        let connector = SqliteConnector::new(SqliteConfig::file(path.to_string_lossy()));
        let mut conn = connector.connect().unwrap();
        conn.execute("CREATE TABLE team (id INTEGER PRIMARY KEY)", &[])
            .unwrap();
        conn.execute(
            "CREATE TABLE hero (id INTEGER PRIMARY KEY, team_id INTEGER, \
             FOREIGN KEY (team_id) REFERENCES team(id))",
            &[],
        )
        .unwrap();
        let err = conn
            .execute("INSERT INTO hero (team_id) VALUES (42)", &[])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Query(QueryError {
                kind: QueryErrorKind::Constraint,
                ..
            })
        ));
        assert!(connector.describe().starts_with("sqlite://"));
    }
}
