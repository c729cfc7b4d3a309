//! Error types for kettle operations.

use std::fmt;

/// The primary error type for all kettle operations.
#[derive(Debug)]
pub enum Error {
    /// Missing or invalid entity declaration
    Metadata(MetadataError),
    /// Invalid schema definition (relationship targets, DDL generation)
    Schema(SchemaError),
    /// Row-to-entity conversion failure
    Mapping {
        /// Name of the entity type being mapped
        entity: &'static str,
        /// The underlying failure
        source: Box<Error>,
    },
    /// SQL execution failure raised by the storage engine
    Persistence(PersistenceError),
    /// A three-phase commit failed and was rolled back
    CommitFailed(Box<Error>),
    /// Connection pool errors (acquisition timeout, closed pool)
    Pool(PoolError),
    /// Unknown database vendor tag
    UnsupportedDialect(String),
    /// Connection-related errors (connect, disconnect)
    Connection(ConnectionError),
    /// Driver-level query execution errors
    Query(QueryError),
    /// Type conversion errors
    Type(TypeError),
    /// Transaction state errors
    Transaction(TransactionError),
    /// Configuration errors
    Config(ConfigError),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct MetadataError {
    pub kind: MetadataErrorKind,
    /// Entity type the declaration belongs to
    pub entity: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataErrorKind {
    /// No attribute is marked as primary key
    MissingPrimaryKey,
    /// More than one attribute is marked as primary key
    MultiplePrimaryKeys,
    /// Two attributes map to the same column
    DuplicateColumn,
    /// Attribute name is not declared on the entity
    UnknownAttribute,
    /// Attribute exists but cannot be read or written this way
    InvalidAttribute,
}

#[derive(Debug)]
pub struct SchemaError {
    pub kind: SchemaErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorKind {
    /// Relationship target is not an entity type
    InvalidRelationTarget,
    /// Invalid schema definition
    Invalid,
}

#[derive(Debug)]
pub struct PersistenceError {
    pub kind: PersistenceErrorKind,
    pub message: String,
    /// Statement that was being executed, if any
    pub sql: Option<String>,
    pub source: Option<Box<Error>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceErrorKind {
    /// Statement execution failed
    Execution,
    /// A single-row query returned several rows
    TooManyRows,
    /// Update of an entity without an identity
    NullPrimaryKey,
    /// Another instance already holds the same identity in a session
    DuplicateIdentity,
}

#[derive(Debug)]
pub struct PoolError {
    pub kind: PoolErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolErrorKind {
    /// Connection checkout timeout
    Timeout,
    /// Pool is closed
    Closed,
    /// Pool state lock was poisoned by a panicking thread
    Poisoned,
    /// Configuration error
    Config,
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish connection
    Connect,
    /// Connection is closed or lost
    Disconnected,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Syntax error in SQL
    Syntax,
    /// Constraint violation (unique, foreign key, etc.)
    Constraint,
    /// Other database error
    Database,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

#[derive(Debug)]
pub struct TransactionError {
    pub kind: TransactionErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionErrorKind {
    /// `begin_transaction` called while a transaction is running
    AlreadyActive,
    /// Commit requested without an active transaction
    NotActive,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
}

impl Error {
    /// Wrap a failure raised while mapping a row into `entity`.
    pub fn mapping(entity: &'static str, source: Error) -> Self {
        Error::Mapping {
            entity,
            source: Box::new(source),
        }
    }

    /// Wrap a driver failure raised while executing `sql`.
    pub fn persistence(message: impl Into<String>, sql: &str, source: Error) -> Self {
        Error::Persistence(PersistenceError {
            kind: PersistenceErrorKind::Execution,
            message: message.into(),
            sql: Some(sql.to_string()),
            source: Some(Box::new(source)),
        })
    }

    /// Is this an acquisition timeout from the connection pool?
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Pool(p) if p.kind == PoolErrorKind::Timeout)
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            Error::Persistence(p) => p.sql.as_deref(),
            Error::Mapping { source, .. } | Error::CommitFailed(source) => source.sql(),
            _ => None,
        }
    }
}

impl MetadataError {
    pub fn new(kind: MetadataErrorKind, entity: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            entity,
            message: message.into(),
        }
    }

    pub fn unknown_attribute(entity: &'static str, attribute: &str) -> Self {
        Self::new(
            MetadataErrorKind::UnknownAttribute,
            entity,
            format!("{entity} has no attribute '{attribute}'"),
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Metadata(e) => write!(f, "Metadata error: {}", e.message),
            Error::Schema(e) => write!(f, "Schema error: {}", e.message),
            Error::Mapping { entity, source } => {
                write!(f, "Failed to auto-map row to entity {}: {}", entity, source)
            }
            Error::Persistence(e) => write!(f, "Persistence error: {}", e.message),
            Error::CommitFailed(e) => write!(f, "Commit failed: {}", e),
            Error::Pool(e) => write!(f, "Pool error: {}", e.message),
            Error::UnsupportedDialect(vendor) => {
                write!(f, "Unsupported database type: {}", vendor)
            }
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Query(e) => write!(f, "Query error: {}", e.message),
            Error::Type(e) => write!(f, "Type error: {}", e),
            Error::Transaction(e) => write!(f, "Transaction error: {}", e.message),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Mapping { source, .. } | Error::CommitFailed(source) => Some(source.as_ref()),
            Error::Persistence(PersistenceError { source, .. }) => source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Connection(ConnectionError { source, .. })
            | Error::Query(QueryError { source, .. }) => source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

/// Payloads whose display is their message.
macro_rules! display_message {
    ($($payload:ty),* $(,)?) => {
        $(
            impl fmt::Display for $payload {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.message)
                }
            }
        )*
    };
}

display_message!(
    MetadataError,
    SchemaError,
    PoolError,
    ConnectionError,
    QueryError,
    TransactionError,
    ConfigError,
);

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sql {
            Some(sql) => write!(f, "{} [{}]", self.message, sql),
            None => f.write_str(&self.message),
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, column, self.actual
            ),
            None => write!(f, "expected {}, found {}", self.expected, self.actual),
        }
    }
}

macro_rules! into_error {
    ($($payload:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$payload> for Error {
                fn from(err: $payload) -> Self {
                    Error::$variant(err)
                }
            }
        )*
    };
}

into_error! {
    MetadataError => Metadata,
    SchemaError => Schema,
    PersistenceError => Persistence,
    PoolError => Pool,
    ConnectionError => Connection,
    QueryError => Query,
    TypeError => Type,
    TransactionError => Transaction,
    ConfigError => Config,
}

/// Result type alias for kettle operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn mapping_error_names_entity_and_keeps_source() {
        let err = Error::mapping(
            "User",
            Error::Type(TypeError {
                expected: "i64",
                actual: "TEXT".to_string(),
                column: Some("id".to_string()),
            }),
        );

        let rendered = err.to_string();
        assert!(rendered.contains("User"));
        assert!(rendered.contains("column 'id'"));
        assert!(err.source().is_some());
    }

    #[test]
    fn sql_is_found_through_wrappers() {
        let inner = Error::persistence(
            "Failed to execute UPDATE",
            "UPDATE users SET name = ? WHERE id = ?",
            Error::Custom("boom".to_string()),
        );
        let err = Error::CommitFailed(Box::new(inner));
        assert_eq!(err.sql(), Some("UPDATE users SET name = ? WHERE id = ?"));
    }

    #[test]
    fn timeout_flag() {
        let timeout = Error::Pool(PoolError {
            kind: PoolErrorKind::Timeout,
            message: "timed out".to_string(),
        });
        let closed = Error::Pool(PoolError {
            kind: PoolErrorKind::Closed,
            message: "closed".to_string(),
        });
        assert!(timeout.is_timeout());
        assert!(!closed.is_timeout());
    }

    #[test]
    fn unsupported_dialect_message() {
        let err = Error::UnsupportedDialect("oracle".to_string());
        assert_eq!(err.to_string(), "Unsupported database type: oracle");
    }
}
