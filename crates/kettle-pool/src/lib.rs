//! Connection pooling for kettle.
//!
//! A fixed-size, blocking pool. Every connection is opened up front by
//! [`ConnectionPool::create`]; [`ConnectionPool::acquire`] waits on a
//! condition variable until one is idle or the acquire timeout elapses.
//! Checked-out connections come wrapped in a [`PooledConnection`] guard that
//! hands the connection back when dropped, replacing it first if it died
//! while borrowed.

use kettle_core::error::{PoolError, PoolErrorKind};
use kettle_core::{Connection, Connector, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Default number of pooled connections.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Default time to wait for an idle connection.
pub const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 30_000;

/// Connection pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of connections opened at creation and kept afterwards
    pub size: usize,
    /// Maximum time to wait for a connection in milliseconds
    pub acquire_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_POOL_SIZE,
            acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT_MS,
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration with the given size.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    /// Set acquire timeout.
    pub fn acquire_timeout(mut self, ms: u64) -> Self {
        self.acquire_timeout_ms = ms;
        self
    }

    fn acquire_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

/// Pool statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Live connections (idle + in use)
    pub size: usize,
    /// Connections waiting in the queue
    pub idle: usize,
    /// Connections currently checked out
    pub in_use: usize,
    /// Threads blocked in `acquire`
    pub waiting: usize,
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} in use, {} idle, {} waiting",
            self.in_use, self.size, self.idle, self.waiting
        )
    }
}

struct PoolState {
    idle: VecDeque<Box<dyn Connection>>,
    in_use: usize,
    waiting: usize,
    closed: bool,
}

struct PoolInner {
    connector: Arc<dyn Connector>,
    config: PoolConfig,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl PoolInner {
    fn lock(&self) -> Result<MutexGuard<'_, PoolState>> {
        self.state.lock().map_err(|_| {
            Error::Pool(PoolError {
                kind: PoolErrorKind::Poisoned,
                message: "pool state lock poisoned".to_string(),
            })
        })
    }

    /// Hand a connection back. Never fails: a dead connection is replaced if
    /// possible, otherwise the pool shrinks by one.
    fn release(&self, mut conn: Box<dyn Connection>) {
        if conn.in_transaction() {
            tracing::warn!("Connection returned with an open transaction, rolling back");
            if let Err(e) = conn.rollback() {
                tracing::warn!(error = %e, "Rollback on release failed");
            }
        }

        let conn = if conn.is_valid() {
            Some(conn)
        } else {
            let _ = conn.close();
            match self.connector.connect() {
                Ok(fresh) => {
                    tracing::debug!("Replaced dead pooled connection");
                    Some(fresh)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to replace dead pooled connection");
                    None
                }
            }
        };

        // Releasing must not panic or fail; take the state even if poisoned.
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        state.in_use = state.in_use.saturating_sub(1);
        let leftover = match conn {
            Some(conn) if !state.closed => {
                state.idle.push_back(conn);
                None
            }
            other => other,
        };
        drop(state);
        self.available.notify_one();

        if let Some(mut conn) = leftover {
            if let Err(e) = conn.close() {
                tracing::warn!(error = %e, "Failed to close connection released after shutdown");
            }
        }
    }
}

/// A fixed-size pool of database connections.
///
/// Cloning is cheap and every clone shares the same connections.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Create a pool and eagerly open `config.size` connections.
    ///
    /// Fails if any connection cannot be opened; connections opened so far
    /// are closed again.
    pub fn create(connector: Arc<dyn Connector>, config: PoolConfig) -> Result<Self> {
        if config.size == 0 {
            return Err(Error::Pool(PoolError {
                kind: PoolErrorKind::Config,
                message: "pool size must be at least 1".to_string(),
            }));
        }

        let mut idle = VecDeque::with_capacity(config.size);
        for _ in 0..config.size {
            match connector.connect() {
                Ok(conn) => idle.push_back(conn),
                Err(e) => {
                    for mut conn in idle {
                        let _ = conn.close();
                    }
                    return Err(e);
                }
            }
        }

        tracing::info!(
            target_db = %connector.describe(),
            size = config.size,
            acquire_timeout_ms = config.acquire_timeout_ms,
            "Connection pool created"
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                connector,
                config,
                state: Mutex::new(PoolState {
                    idle,
                    in_use: 0,
                    waiting: 0,
                    closed: false,
                }),
                available: Condvar::new(),
            }),
        })
    }

    /// Get the pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Check out a connection, waiting up to the configured acquire timeout.
    pub fn acquire(&self) -> Result<PooledConnection> {
        self.acquire_timeout(self.inner.config.acquire_timeout_duration())
    }

    /// Check out a connection, waiting up to `timeout`.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<PooledConnection> {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.lock()?;

        loop {
            if state.closed {
                return Err(closed());
            }
            if let Some(conn) = state.idle.pop_front() {
                state.in_use += 1;
                tracing::trace!(idle = state.idle.len(), in_use = state.in_use, "Acquired");
                return Ok(PooledConnection {
                    conn: Some(conn),
                    pool: Arc::clone(&self.inner),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(?timeout, in_use = state.in_use, "Acquire timed out");
                return Err(Error::Pool(PoolError {
                    kind: PoolErrorKind::Timeout,
                    message: format!(
                        "no connection became available within {} ms",
                        timeout.as_millis()
                    ),
                }));
            }

            state.waiting += 1;
            let (guard, _) = self
                .inner
                .available
                .wait_timeout(state, deadline - now)
                .map_err(|_| {
                    Error::Pool(PoolError {
                        kind: PoolErrorKind::Poisoned,
                        message: "pool state lock poisoned".to_string(),
                    })
                })?;
            state = guard;
            state.waiting -= 1;
        }
    }

    /// Close every idle connection and refuse further checkouts.
    ///
    /// Connections still checked out are closed when their guards drop.
    /// Calling this more than once is a no-op.
    pub fn shutdown(&self) {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if state.closed {
            return;
        }
        state.closed = true;
        let idle: Vec<_> = state.idle.drain(..).collect();
        let in_use = state.in_use;
        drop(state);
        self.inner.available.notify_all();

        for mut conn in idle {
            if let Err(e) = conn.close() {
                tracing::warn!(error = %e, "Failed to close pooled connection");
            }
        }
        tracing::info!(in_use, "Connection pool shut down");
    }

    /// Whether `shutdown` has been called.
    pub fn is_closed(&self) -> bool {
        self.inner
            .state
            .lock()
            .map(|s| s.closed)
            .unwrap_or(true)
    }

    /// Get the current pool statistics.
    pub fn stats(&self) -> PoolStats {
        match self.inner.state.lock() {
            Ok(state) => PoolStats {
                size: state.idle.len() + state.in_use,
                idle: state.idle.len(),
                in_use: state.in_use,
                waiting: state.waiting,
            },
            Err(_) => PoolStats::default(),
        }
    }
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

fn closed() -> Error {
    Error::Pool(PoolError {
        kind: PoolErrorKind::Closed,
        message: "connection pool is shut down".to_string(),
    })
}

/// A connection borrowed from the pool.
///
/// Dereferences to the underlying [`Connection`]; dropping it returns the
/// connection to the pool.
pub struct PooledConnection {
    conn: Option<Box<dyn Connection>>,
    pool: Arc<PoolInner>,
}

impl PooledConnection {
    fn conn(&self) -> &(dyn Connection + 'static) {
        match &self.conn {
            Some(conn) => conn.as_ref(),
            // Only `Drop` takes the connection out.
            None => unreachable!("pooled connection used after release"),
        }
    }

    fn conn_mut(&mut self) -> &mut (dyn Connection + 'static) {
        match &mut self.conn {
            Some(conn) => conn.as_mut(),
            None => unreachable!("pooled connection used after release"),
        }
    }
}

impl std::ops::Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.conn()
    }
}

impl std::ops::DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn_mut()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("in_transaction", &self.conn().in_transaction())
            .finish()
    }
}
