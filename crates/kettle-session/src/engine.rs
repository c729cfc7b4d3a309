//! Shared engine state: the pool, the dialect and the custom mappers.
//!
//! An [`Engine`] is built once and shared (`Arc<Engine>`) between every
//! session and every direct query. Besides opening sessions it runs the
//! connection-level operations that need no unit of work: DDL, raw
//! statements and mapped queries.

use crate::mapper::{AutoRowMapper, MapperRegistry, RowMapper, too_many_rows};
use crate::session::Session;
use kettle_core::{Error, Model, ModelRef, Result, Value, metadata};
use kettle_pool::{ConnectionPool, PoolStats};
use kettle_schema::{Dialect, create_table};
use std::sync::Arc;

/// Connection pool, dialect and custom mappers shared by every session.
pub struct Engine {
    pool: ConnectionPool,
    dialect: &'static dyn Dialect,
    mappers: MapperRegistry,
}

impl Engine {
    pub fn new(pool: ConnectionPool, dialect: &'static dyn Dialect) -> Self {
        Self {
            pool,
            dialect,
            mappers: MapperRegistry::new(),
        }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn dialect(&self) -> &'static dyn Dialect {
        self.dialect
    }

    pub fn mappers(&self) -> &MapperRegistry {
        &self.mappers
    }

    /// Replace auto-mapping of `M` with `mapper` for every later query.
    pub fn register_mapper<M: Model>(&self, mapper: impl RowMapper<M> + 'static) {
        self.mappers.register::<M>(mapper);
    }

    /// Open a session on a pooled connection.
    pub fn open_session(self: &Arc<Self>) -> Result<Session> {
        Session::new(Arc::clone(self))
    }

    /// Create the table of `M` if it does not exist.
    #[tracing::instrument(level = "debug", skip(self), fields(entity = M::NAME))]
    pub fn create_table<M: Model>(&self) -> Result<()> {
        let meta = metadata::resolve::<M>()?;
        let ddl = create_table(&meta, self.dialect)?;
        let mut conn = self.pool.acquire()?;
        tracing::debug!(sql = %ddl, "Creating table");
        conn.execute(&ddl, &[])
            .map_err(|e| Error::persistence(format!("Failed to create table {}", meta.table()), &ddl, e))?;
        Ok(())
    }

    /// Run `sql` and map every row into an `M`.
    pub fn query_for_list<M: Model>(&self, sql: &str, params: &[Value]) -> Result<Vec<ModelRef<M>>> {
        let mut conn = self.pool.acquire()?;
        tracing::debug!(sql = %sql, params = params.len(), "Executing query");
        let rows = conn
            .query(sql, params)
            .map_err(|e| Error::persistence("Failed to execute query", sql, e))?;
        let mut mapper = AutoRowMapper::new(&mut *conn, self.dialect, &self.mappers);
        mapper.map_rows::<M>(&rows)
    }

    /// Run `sql` and map its single row into an `M`.
    ///
    /// Zero rows give `None`; more than one row is an error.
    pub fn query_for_object<M: Model>(&self, sql: &str, params: &[Value]) -> Result<Option<ModelRef<M>>> {
        let mut conn = self.pool.acquire()?;
        tracing::debug!(sql = %sql, params = params.len(), "Executing query");
        let rows = conn
            .query(sql, params)
            .map_err(|e| Error::persistence("Failed to execute query", sql, e))?;
        match rows.as_slice() {
            [] => Ok(None),
            [row] => {
                let mut mapper = AutoRowMapper::new(&mut *conn, self.dialect, &self.mappers);
                mapper.map_row::<M>(row).map(Some)
            }
            _ => Err(too_many_rows(sql)),
        }
    }

    /// Execute a raw statement. Returns the affected row count.
    pub fn update(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let mut conn = self.pool.acquire()?;
        tracing::debug!(sql = %sql, params = params.len(), "Executing statement");
        conn.execute(sql, params)
            .map_err(|e| Error::persistence("Failed to execute statement", sql, e))
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Close the pool. Idempotent.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("dialect", &self.dialect.name())
            .field("pool", &self.pool)
            .field("mappers", &self.mappers)
            .finish()
    }
}
