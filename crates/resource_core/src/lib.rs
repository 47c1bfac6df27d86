//! Generic relational resource adapter.
//! Uniform, injection-safe CRUD over any table declared by a `TableDescriptor`.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use config::StoreConfig;
pub use db::{ConnectionPool, DbError, DbResult, Store};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::descriptor::{KeyGeneration, TableDescriptor};
pub use model::record::{FilterMap, GenericRecord, Payload};
pub use model::value::Value;
pub use query::ident::ValidationError;
pub use query::page::{PageRequest, SortDirection, SortRequest};
pub use repo::{RepoError, RepoResult, Resource, ResourceRepository};
pub use service::registry::{RegistryError, ResourceRegistry};
pub use service::resource_service::{ResourcePage, ResourceService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
