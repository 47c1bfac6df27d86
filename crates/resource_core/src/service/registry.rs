//! Name-to-descriptor registry.
//!
//! # Responsibility
//! - Hold the trusted descriptors an application exposes.
//! - Hand out `Resource`s bound to a caller-chosen store.
//!
//! # Invariants
//! - Table names are unique within a registry.
//! - Lookups are exact; an unregistered name never reaches a statement.

use crate::db::Store;
use crate::model::descriptor::{DescriptorError, TableDescriptor};
use crate::query::ident::ValidationError;
use crate::repo::{RepoResult, Resource};
use crate::service::catalog::site_descriptors;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug)]
pub enum RegistryError {
    Descriptor(DescriptorError),
    Json(serde_json::Error),
    DuplicateTable(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Descriptor(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "invalid descriptor catalog: {err}"),
            Self::DuplicateTable(name) => write!(f, "table `{name}` registered twice"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Descriptor(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::DuplicateTable(_) => None,
        }
    }
}

impl From<DescriptorError> for RegistryError {
    fn from(value: DescriptorError) -> Self {
        Self::Descriptor(value)
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Immutable-after-setup set of table descriptors keyed by table name.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    tables: BTreeMap<String, Arc<TableDescriptor>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry of the migrated site tables.
    pub fn site() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for descriptor in site_descriptors()? {
            registry.insert(descriptor)?;
        }
        Ok(registry)
    }

    /// Loads a JSON array of descriptor declarations.
    ///
    /// Every declaration is validated exactly like the builder path.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let descriptors: Vec<TableDescriptor> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.insert(descriptor)?;
        }
        Ok(registry)
    }

    pub fn insert(&mut self, descriptor: TableDescriptor) -> Result<(), RegistryError> {
        let name = descriptor.name().to_string();
        if self.tables.contains_key(&name) {
            return Err(RegistryError::DuplicateTable(name));
        }
        self.tables.insert(name, Arc::new(descriptor));
        Ok(())
    }

    pub fn descriptor(&self, name: &str) -> Option<&Arc<TableDescriptor>> {
        self.tables.get(name)
    }

    /// Registered table names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Binds the descriptor registered as `name` to `store`.
    ///
    /// # Errors
    /// - `ValidationError::UnknownTable` for unregistered names.
    pub fn resource<S: Store>(&self, name: &str, store: S) -> RepoResult<Resource<S>> {
        let descriptor = self
            .tables
            .get(name)
            .ok_or_else(|| ValidationError::UnknownTable(name.to_string()))?;
        Ok(Resource::new(Arc::clone(descriptor), store))
    }
}
