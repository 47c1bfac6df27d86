//! Bounded SQLite connection pool.
//!
//! # Responsibility
//! - Hand out at most `max_connections` migrated connections.
//! - Return connections through a drop guard on every exit path.
//!
//! # Invariants
//! - `open <= max_connections` at all times.
//! - An in-memory pool owns a single private connection. SQLite shared-cache
//!   mode uses table-level locks that fail writers with `SQLITE_LOCKED`
//!   instead of waiting on the busy handler.
//! - A guard holds exactly one connection and gives it back exactly once.
//! - No pool lock is held while a statement runs.

use super::open::{open_file_with_timeout, open_memory_with_timeout};
use super::store::{run_statement, Store, StoreOutput};
use super::{DbError, DbResult};
use crate::config::StoreConfig;
use crate::query::builder::QueryStatement;
use log::{debug, warn};
use rusqlite::Connection;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub open: usize,
    pub idle: usize,
    pub in_use: usize,
    pub max_connections: usize,
}

/// Cloneable handle to a shared pool of SQLite connections.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    config: StoreConfig,
    target: PoolTarget,
    max_connections: usize,
    state: Mutex<PoolState>,
    released: Condvar,
}

enum PoolTarget {
    File(PathBuf),
    Memory,
}

#[derive(Default)]
struct PoolState {
    idle: Vec<Connection>,
    open: usize,
}

impl ConnectionPool {
    /// Creates a pool and eagerly opens (and migrates) its first connection.
    ///
    /// An in-memory config gets one pool-private connection regardless of
    /// `max_connections`; callers queue for it.
    pub fn new(config: StoreConfig) -> DbResult<Self> {
        config.validate()?;

        let (target, max_connections) = match &config.path {
            Some(path) => (PoolTarget::File(path.clone()), config.max_connections),
            None => (PoolTarget::Memory, 1),
        };
        if max_connections < config.max_connections {
            debug!(
                "event=pool_init module=db status=capped mode=memory requested={} max_connections={max_connections}",
                config.max_connections
            );
        }
        let pool = Self {
            inner: Arc::new(PoolInner {
                config,
                target,
                max_connections,
                state: Mutex::new(PoolState::default()),
                released: Condvar::new(),
            }),
        };

        let first = pool.inner.open_connection()?;
        let mut state = pool.inner.lock_state();
        state.open = 1;
        state.idle.push(first);
        drop(state);

        Ok(pool)
    }

    /// Borrows a connection, waiting up to `acquire_timeout`.
    pub fn get(&self) -> DbResult<PooledConnection> {
        self.get_until(None)
    }

    /// Borrows a connection, waiting until `acquire_timeout` or `deadline`,
    /// whichever comes first.
    pub fn get_until(&self, deadline: Option<Instant>) -> DbResult<PooledConnection> {
        let started_at = Instant::now();
        let timeout_at = started_at + self.inner.config.acquire_timeout;
        let wait_until = deadline.map_or(timeout_at, |deadline| deadline.min(timeout_at));

        let mut state = self.inner.lock_state();
        loop {
            if let Some(conn) = state.idle.pop() {
                return Ok(self.guard(conn));
            }

            if state.open < self.inner.max_connections {
                state.open += 1;
                drop(state);
                return match self.inner.open_connection() {
                    Ok(conn) => {
                        debug!("event=pool_grow module=db status=ok");
                        Ok(self.guard(conn))
                    }
                    Err(err) => {
                        self.inner.forget_one();
                        Err(err)
                    }
                };
            }

            let now = Instant::now();
            if now >= wait_until {
                let waited = now.duration_since(started_at);
                warn!(
                    "event=pool_acquire module=db status=error error_code=pool_timeout waited_ms={} max_connections={}",
                    waited.as_millis(),
                    self.inner.max_connections
                );
                if deadline.is_some_and(|deadline| now >= deadline) {
                    return Err(DbError::DeadlineExceeded);
                }
                return Err(DbError::PoolTimeout {
                    waited,
                    max_connections: self.inner.max_connections,
                });
            }

            state = self
                .inner
                .released
                .wait_timeout(state, wait_until - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.inner.lock_state();
        PoolStats {
            open: state.open,
            idle: state.idle.len(),
            in_use: state.open - state.idle.len(),
            max_connections: self.inner.max_connections,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    fn guard(&self, conn: Connection) -> PooledConnection {
        PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
        }
    }
}

impl Store for ConnectionPool {
    /// Acquires one connection for exactly this statement.
    fn execute_statement(
        &self,
        statement: &QueryStatement,
        deadline: Option<Instant>,
    ) -> DbResult<StoreOutput> {
        let conn = self.get_until(deadline)?;
        run_statement(&conn, statement, deadline)
    }
}

impl PoolInner {
    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open_connection(&self) -> DbResult<Connection> {
        match &self.target {
            PoolTarget::File(path) => open_file_with_timeout(path, self.config.busy_timeout),
            PoolTarget::Memory => open_memory_with_timeout(self.config.busy_timeout),
        }
    }

    fn give_back(&self, conn: Connection) {
        let mut state = self.lock_state();
        state.idle.push(conn);
        drop(state);
        self.released.notify_one();
    }

    fn forget_one(&self) {
        let mut state = self.lock_state();
        state.open = state.open.saturating_sub(1);
        drop(state);
        self.released.notify_one();
    }
}

/// A borrowed pool connection. Dropping it returns the connection.
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        match self.conn.as_ref() {
            Some(conn) => conn,
            None => unreachable!("pooled connection used after release"),
        }
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        // A transaction left open by the borrower must not leak into the next one.
        if !conn.is_autocommit() {
            if let Err(err) = conn.execute_batch("ROLLBACK;") {
                warn!(
                    "event=pool_release module=db status=error error_code=rollback_failed error={err}"
                );
                drop(conn);
                self.pool.forget_one();
                return;
            }
        }

        self.pool.give_back(conn);
    }
}
