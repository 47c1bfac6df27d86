//! SQLite storage bootstrap, statement execution and connection pooling.
//!
//! # Responsibility
//! - Open and configure SQLite connections.
//! - Apply schema migrations in deterministic order.
//! - Execute one `QueryStatement` per call behind the `Store` trait.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Returned connections have `foreign_keys=ON` and migrations applied.
//! - Pooled connections go back to the pool on every exit path.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub mod migrations;
mod open;
pub mod pool;
pub mod store;

pub use open::{open_db, open_db_in_memory};
pub use pool::{ConnectionPool, PoolStats, PooledConnection};
pub use store::{Store, StoreOutput};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// No pooled connection became free in time.
    PoolTimeout {
        waited: Duration,
        max_connections: usize,
    },
    /// The caller-supplied deadline expired before or during execution.
    DeadlineExceeded,
    InvalidConfig(String),
}

impl DbError {
    /// Stable, value-free error code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite_error",
            Self::UnsupportedSchemaVersion { .. } => "unsupported_schema_version",
            Self::PoolTimeout { .. } => "pool_timeout",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::PoolTimeout {
                waited,
                max_connections,
            } => write!(
                f,
                "no connection available after {}ms (max_connections={max_connections})",
                waited.as_millis()
            ),
            Self::DeadlineExceeded => write!(f, "statement deadline exceeded"),
            Self::InvalidConfig(message) => write!(f, "invalid store configuration: {message}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. }
            | Self::PoolTimeout { .. }
            | Self::DeadlineExceeded
            | Self::InvalidConfig(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
