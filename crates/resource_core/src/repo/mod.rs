//! Repository layer over described tables.
//!
//! # Responsibility
//! - Expose the generic `ResourceRepository` contract.
//! - Keep statement construction and store details out of callers.
//!
//! # Invariants
//! - Every caller-supplied identifier is validated before any statement runs.
//! - Repository APIs separate "no such row" (`None`) from store failures.

pub mod resource_repo;

pub use resource_repo::{RepoError, RepoResult, Resource, ResourceRepository};
