//! kettle - a small unit-of-work persistence engine.
//!
//! kettle maps declared entity types to tables and keeps a unit of work per
//! [`Session`]:
//!
//! - one instance per loaded row (identity map)
//! - snapshot-based change detection, so only changed entities are updated
//! - INSERT / UPDATE / DELETE ordered so foreign keys resolve
//! - one database transaction per commit, rolled back as a whole on failure
//!
//! # Quick Start
//!
//! ```ignore
//! use kettle::prelude::*;
//!
//! #[derive(Model, Debug, Default)]
//! #[kettle(table = "users")]
//! struct User {
//!     #[kettle(id)]
//!     id: Option<i64>,
//!     #[kettle(unique)]
//!     username: String,
//!     password: String,
//! }
//!
//! fn main() -> kettle::Result<()> {
//!     let db = Database::connect(DataSource::sqlite("app.db").pool_size(4))?;
//!     db.create_table::<User>()?;
//!
//!     let alice = model_ref(User {
//!         id: None,
//!         username: "alice".to_string(),
//!         password: "x".to_string(),
//!     });
//!
//!     let mut session = db.open_session()?;
//!     session.begin_transaction()?;
//!     session.persist(&alice)?;
//!     session.commit()?;
//!
//!     let id = db.primary_key_value(&alice)?;
//!     let found = db.open_session()?.find_by_id::<User>(id)?;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - **Derived mappings**: `#[derive(Model)]` generates a static declaration
//!   table; nothing is discovered at runtime
//! - **Relationships**: eager or lazy to-one references through [`Related`],
//!   with cascade persist
//! - **Dialects**: PostgreSQL, MySQL and SQLite column types and DDL
//! - **Connection pooling**: fixed size with a bounded checkout wait
//! - **Raw SQL**: parameterized queries mapped into entities, with custom
//!   row mappers per type

pub mod database;
pub mod datasource;

pub use database::Database;
pub use datasource::DataSource;

// Re-export all public types from sub-crates
pub use kettle_core::{
    // Entity declarations
    AttributeDecl,
    AttributeValue,
    Cardinality,
    Cascade,
    // Connections
    Connection,
    Connector,
    EntityMetadata,
    EntityType,
    // Errors
    Error,
    FetchMode,
    FromValue,
    Model,
    ModelRef,
    RelationDecl,
    Related,
    Result,
    Row,
    SqlType,
    TypeInfo,
    Value,
    model_ref,
};

pub use kettle_macros::Model;

pub use kettle_schema::{DatabaseType, Dialect, MySql, Postgres, Sqlite, create_table};

pub use kettle_pool::{ConnectionPool, PoolConfig, PoolStats, PooledConnection};

pub use kettle_session::{Engine, EntityState, MapperRegistry, RowMapper, Session};

pub use kettle_sqlite::{SqliteConfig, SqliteConnection, SqliteConnector};

/// Commonly used items.
///
/// ```ignore
/// use kettle::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        DataSource, Database, Error, Model, ModelRef, Related, Result, Row, RowMapper, Session,
        Value, model_ref,
    };
}
