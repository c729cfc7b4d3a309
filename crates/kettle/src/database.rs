//! The storage engine: a pool, a dialect and the custom mappers behind one
//! handle.

use crate::datasource::DataSource;
use kettle_core::{ConfigError, Connector, Model, ModelRef, Result, Value, primary_key_of};
use kettle_pool::{ConnectionPool, PoolStats};
use kettle_schema::{DatabaseType, Dialect};
use kettle_session::{Engine, RowMapper, Session};
use kettle_sqlite::{SqliteConfig, SqliteConnector};
use std::sync::Arc;

/// Entry point of the persistence engine.
///
/// Opening a `Database` opens every pooled connection up front, so an
/// unreachable database fails here rather than on first use. The pool is
/// shut down by [`Database::shutdown`] or when the `Database` is dropped.
pub struct Database {
    engine: Arc<Engine>,
    source: DataSource,
}

impl Database {
    /// Open `source` with the built-in driver for its vendor.
    ///
    /// Only SQLite has a built-in driver; other vendors go through
    /// [`Database::with_connector`].
    pub fn connect(source: DataSource) -> Result<Self> {
        let database_type = DatabaseType::parse(&source.vendor)?;
        match database_type {
            DatabaseType::Sqlite => {
                let connector = SqliteConnector::new(SqliteConfig::file(source.database.clone()));
                Self::open(source, database_type, Arc::new(connector))
            }
            other => Err(ConfigError {
                message: format!(
                    "no built-in driver for {other}; open it with Database::with_connector"
                ),
            }
            .into()),
        }
    }

    /// Open `source` on connections made by `connector`.
    ///
    /// The vendor tag still selects the dialect.
    pub fn with_connector(source: DataSource, connector: Arc<dyn Connector>) -> Result<Self> {
        let database_type = DatabaseType::parse(&source.vendor)?;
        Self::open(source, database_type, connector)
    }

    #[tracing::instrument(level = "info", skip_all, fields(url = %source.url()))]
    fn open(
        source: DataSource,
        database_type: DatabaseType,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        let pool = ConnectionPool::create(connector, source.pool_config())?;
        let engine = Engine::new(pool, database_type.dialect());
        tracing::info!(dialect = database_type.as_str(), "Database opened");
        Ok(Self {
            engine: Arc::new(engine),
            source,
        })
    }

    /// Open a unit of work on its own pooled connection.
    pub fn open_session(&self) -> Result<Session> {
        self.engine.open_session()
    }

    /// Create the table of `M` if it does not exist.
    pub fn create_table<M: Model>(&self) -> Result<()> {
        self.engine.create_table::<M>()
    }

    /// Run `sql` and map its single row, if any, into an `M`.
    pub fn query_for_object<M: Model>(&self, sql: &str, params: &[Value]) -> Result<Option<ModelRef<M>>> {
        self.engine.query_for_object::<M>(sql, params)
    }

    /// Run `sql` and map every row into an `M`.
    pub fn query_for_list<M: Model>(&self, sql: &str, params: &[Value]) -> Result<Vec<ModelRef<M>>> {
        self.engine.query_for_list::<M>(sql, params)
    }

    /// Execute a raw statement and return the affected row count.
    pub fn update(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.engine.update(sql, params)
    }

    /// Current primary-key value of `entity`; `Value::Null` before insert.
    pub fn primary_key_value<M: Model>(&self, entity: &ModelRef<M>) -> Result<Value> {
        primary_key_of(&**entity)
    }

    /// Use `mapper` instead of automatic mapping whenever rows become `M`.
    pub fn register_mapper<M: Model>(&self, mapper: impl RowMapper<M> + 'static) {
        self.engine.register_mapper::<M>(mapper);
    }

    pub fn dialect(&self) -> &'static dyn Dialect {
        self.engine.dialect()
    }

    pub fn data_source(&self) -> &DataSource {
        &self.source
    }

    pub fn pool(&self) -> &ConnectionPool {
        self.engine.pool()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.engine.pool_stats()
    }

    /// Shared engine state, for code that outlives this handle.
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Close every pooled connection. Idempotent.
    pub fn shutdown(&self) {
        self.engine.shutdown();
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.engine.shutdown();
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("source", &self.source)
            .field("engine", &self.engine)
            .finish()
    }
}
