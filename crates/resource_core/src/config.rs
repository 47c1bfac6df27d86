//! Store configuration.
//!
//! # Responsibility
//! - Describe where the database lives and how the connection pool behaves.
//! - Read overrides from the process environment.
//!
//! # Invariants
//! - `max_connections >= 1`.
//! - An in-memory store is served by exactly one connection.
//! - Secrets never appear here; SQLite needs none.

use crate::db::{DbError, DbResult};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "RESOURCE_DB_PATH";
pub const ENV_DB_POOL_SIZE: &str = "RESOURCE_DB_POOL_SIZE";
pub const ENV_DB_ACQUIRE_TIMEOUT_MS: &str = "RESOURCE_DB_ACQUIRE_TIMEOUT_MS";

const DEFAULT_MAX_CONNECTIONS: usize = 20;
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);
pub(crate) const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection pool and database location settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Database file; `None` means a pool-private in-memory database.
    pub path: Option<PathBuf>,
    /// Upper bound on simultaneously open connections. Ignored (treated as 1)
    /// for in-memory databases.
    pub max_connections: usize,
    /// How long `ConnectionPool::get` waits for a free connection.
    pub acquire_timeout: Duration,
    /// SQLite busy handler timeout for lock contention between connections.
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

impl StoreConfig {
    /// In-memory configuration with defaults.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed configuration with defaults.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Defaults overridden by `RESOURCE_DB_*` environment variables.
    ///
    /// # Errors
    /// - Returns `DbError::InvalidConfig` when a numeric variable does not parse.
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> DbResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DB_PATH).filter(|value| !value.trim().is_empty()) {
            config.path = Some(PathBuf::from(path.trim()));
        }
        if let Some(raw) = lookup(ENV_DB_POOL_SIZE) {
            config.max_connections = parse_number(ENV_DB_POOL_SIZE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_DB_ACQUIRE_TIMEOUT_MS) {
            config.acquire_timeout =
                Duration::from_millis(parse_number(ENV_DB_ACQUIRE_TIMEOUT_MS, &raw)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DbResult<()> {
        if self.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> DbResult<T> {
    raw.trim().parse::<T>().map_err(|_| {
        DbError::InvalidConfig(format!(
            "{key} must be a non-negative integer, got `{raw}`"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::{StoreConfig, ENV_DB_ACQUIRE_TIMEOUT_MS, ENV_DB_PATH, ENV_DB_POOL_SIZE};
    use crate::db::DbError;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = StoreConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert!(config.path.is_none());
    }

    #[test]
    fn environment_overrides_are_applied() {
        let config = StoreConfig::from_lookup(lookup_from(&[
            (ENV_DB_PATH, "/var/lib/site/site.db"),
            (ENV_DB_POOL_SIZE, "4"),
            (ENV_DB_ACQUIRE_TIMEOUT_MS, "250"),
        ]))
        .unwrap();

        assert_eq!(config.path, Some(PathBuf::from("/var/lib/site/site.db")));
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.acquire_timeout, Duration::from_millis(250));
    }

    #[test]
    fn invalid_numbers_and_zero_pool_are_rejected() {
        let err =
            StoreConfig::from_lookup(lookup_from(&[(ENV_DB_POOL_SIZE, "many")])).unwrap_err();
        assert!(
            matches!(err, DbError::InvalidConfig(ref message) if message.contains(ENV_DB_POOL_SIZE))
        );

        let err =
            StoreConfig::from_lookup(lookup_from(&[(ENV_DB_POOL_SIZE, "0")])).unwrap_err();
        assert!(matches!(err, DbError::InvalidConfig(_)));
    }
}
