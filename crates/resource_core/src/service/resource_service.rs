//! Admin-facing resource use cases.
//!
//! # Responsibility
//! - Provide list/get/create/update/delete entry points over any repository.
//! - Turn "no such row" into `RepoError::NotFound` for callers that want one
//!   `Result` per request.
//!
//! # Invariants
//! - Service APIs never bypass repository validation.
//! - The service layer stays storage-agnostic.

use crate::db::Store;
use crate::model::record::{FilterMap, GenericRecord, Payload};
use crate::model::value::Value;
use crate::query::page::{PageRequest, SortRequest};
use crate::repo::{RepoError, RepoResult, Resource, ResourceRepository};
use serde::Serialize;

/// One page of records plus the total matching the same filters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourcePage {
    pub records: Vec<GenericRecord>,
    pub total: u64,
}

/// Use-case wrapper for one table's repository.
pub struct ResourceService<S: Store> {
    repo: Resource<S>,
}

impl<S: Store> ResourceService<S> {
    pub fn new(repo: Resource<S>) -> Self {
        Self { repo }
    }

    /// Lists one page and counts all rows matching `filters`.
    ///
    /// Issues two statements; the total is not a snapshot of the page.
    pub fn list(
        &self,
        filters: &FilterMap,
        sort: &SortRequest,
        page: &PageRequest,
    ) -> RepoResult<ResourcePage> {
        let records = self.repo.find(filters, sort, page)?;
        let total = self.repo.count(filters)?;
        Ok(ResourcePage { records, total })
    }

    /// Loads one record or fails with `NotFound`.
    pub fn get(&self, id: &Value) -> RepoResult<GenericRecord> {
        self.repo
            .find_one(id)?
            .ok_or_else(|| RepoError::not_found(self.repo.descriptor(), id))
    }

    pub fn create(&self, payload: &Payload) -> RepoResult<GenericRecord> {
        self.repo.create(payload)
    }

    /// Updates one record or fails with `NotFound`.
    pub fn update_required(&self, id: &Value, payload: &Payload) -> RepoResult<GenericRecord> {
        self.repo
            .update(id, payload)?
            .ok_or_else(|| RepoError::not_found(self.repo.descriptor(), id))
    }

    /// Deletes one record or fails with `NotFound`.
    pub fn delete_required(&self, id: &Value) -> RepoResult<Value> {
        self.repo
            .delete(id)?
            .ok_or_else(|| RepoError::not_found(self.repo.descriptor(), id))
    }
}
