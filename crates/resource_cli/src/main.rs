//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `resource_core` linkage, migrations and the site catalog.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `resource_cli [DB_PATH]`. Without a path, `RESOURCE_DB_PATH` is
//! used, else a throwaway in-memory database.

use resource_core::{
    default_log_level, init_logging, ConnectionPool, FilterMap, LogTarget, ResourceRegistry,
    ResourceRepository, StoreConfig,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("resource_core ping={}", resource_core::ping());
    println!("resource_core version={}", resource_core::core_version());

    if let Err(err) = init_logging(&default_log_level(), LogTarget::Stderr) {
        eprintln!("logging disabled: {err}");
    }

    match table_counts() {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("resource_cli failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn table_counts() -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let mut config = StoreConfig::from_env()?;
    if let Some(path) = std::env::args().nth(1) {
        config.path = Some(path.into());
    }

    let pool = ConnectionPool::new(config)?;
    let registry = ResourceRegistry::site()?;

    let mut counts = serde_json::Map::new();
    for name in registry.names() {
        let count = registry.resource(name, &pool)?.count(&FilterMap::new())?;
        counts.insert(name.to_string(), count.into());
    }

    Ok(serde_json::json!({ "tables": counts }))
}
