//! Generic resource repository over any described table.
//!
//! # Responsibility
//! - Provide `find/find_one/count/create/update/delete` for one table.
//! - Validate every caller input before a statement exists.
//! - Map store rows to `GenericRecord`s and store failures to `RepoError`s.
//!
//! # Invariants
//! - Each operation issues at most one statement; validation failures issue none.
//! - Store errors are never turned into empty results.
//! - Bound parameter values are never logged; only statement text (identifiers
//!   and placeholders), parameter counts, row counts and durations.

use crate::db::{DbError, Store, StoreOutput};
use crate::logging::single_line;
use crate::model::descriptor::{KeyGeneration, TableDescriptor};
use crate::model::record::{FilterMap, GenericRecord, Payload, Row};
use crate::model::value::Value;
use crate::query::builder::{
    build_count, build_delete, build_find_one, build_insert, build_select, build_update,
    QueryStatement,
};
use crate::query::filter::translate;
use crate::query::ident::ValidationError;
use crate::query::page::{normalize_page, normalize_sort, PageRequest, SortRequest};
use log::{debug, error, warn};
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

const MAX_LOGGED_ERROR_CHARS: usize = 240;

pub type RepoResult<T> = Result<T, RepoError>;

/// Typed failure for resource operations.
#[derive(Debug)]
pub enum RepoError {
    /// Caller input rejected before touching the store.
    Validation(ValidationError),
    /// A primary-key targeted operation matched no row.
    NotFound { table: String, id: Value },
    /// The store rejected a write because of a UNIQUE/CHECK/NOT NULL/FK rule.
    ConstraintViolation {
        table: String,
        constraint: Option<String>,
        message: String,
    },
    /// Any other store failure; fatal to the current operation.
    Adapter { table: String, source: DbError },
    /// The store returned a row this table's descriptor cannot represent.
    InvalidData(String),
}

impl RepoError {
    /// Stable, value-free error code for logs and API envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::ConstraintViolation { .. } => "constraint_violation",
            Self::Adapter { .. } => "adapter_error",
            Self::InvalidData(_) => "invalid_data",
        }
    }

    pub fn not_found(descriptor: &TableDescriptor, id: &Value) -> Self {
        Self::NotFound {
            table: descriptor.name().to_string(),
            id: id.clone(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { table, id } => write!(f, "{table} record not found: {id}"),
            Self::ConstraintViolation {
                table,
                constraint: Some(constraint),
                ..
            } => write!(f, "{table} write violates constraint `{constraint}`"),
            Self::ConstraintViolation { table, message, .. } => {
                write!(f, "{table} write violates a constraint: {message}")
            }
            Self::Adapter { table, source } => write!(f, "{table} store error: {source}"),
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Adapter { source, .. } => Some(source),
            Self::NotFound { .. } | Self::ConstraintViolation { .. } | Self::InvalidData(_) => {
                None
            }
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Uniform operations over one described table.
///
/// `None` results mean "no row with that primary key"; they are not errors.
pub trait ResourceRepository {
    fn find(
        &self,
        filters: &FilterMap,
        sort: &SortRequest,
        page: &PageRequest,
    ) -> RepoResult<Vec<GenericRecord>>;
    fn find_one(&self, id: &Value) -> RepoResult<Option<GenericRecord>>;
    fn count(&self, filters: &FilterMap) -> RepoResult<u64>;
    /// Inserts `payload`; the key comes from the store or the descriptor's
    /// key generation, never from the payload.
    fn create(&self, payload: &Payload) -> RepoResult<GenericRecord>;
    /// Inserts `payload` under a caller-chosen primary key.
    fn create_with_id(&self, id: &Value, payload: &Payload) -> RepoResult<GenericRecord>;
    fn update(&self, id: &Value, payload: &Payload) -> RepoResult<Option<GenericRecord>>;
    /// Deletes one row and returns its id.
    fn delete(&self, id: &Value) -> RepoResult<Option<Value>>;
}

/// Store-backed [`ResourceRepository`] for one table.
///
/// Holds no mutable state; cloning or sharing across threads is as safe as
/// the underlying store.
#[derive(Debug, Clone)]
pub struct Resource<S> {
    descriptor: Arc<TableDescriptor>,
    store: S,
    deadline: Option<Instant>,
}

impl<S: Store> Resource<S> {
    pub fn new(descriptor: Arc<TableDescriptor>, store: S) -> Self {
        Self {
            descriptor,
            store,
            deadline: None,
        }
    }

    /// Applies a caller deadline to every statement this handle runs.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }

    fn insert(&self, payload: &Payload, id: Option<&Value>) -> RepoResult<GenericRecord> {
        let statement = self.validated("create", build_insert(&self.descriptor, payload, id))?;
        let output = self.run("create", &statement)?;
        let row = output.rows.into_iter().next().ok_or_else(|| {
            RepoError::InvalidData(format!(
                "insert into `{}` returned no row",
                self.descriptor.name()
            ))
        })?;
        self.record(row)
    }

    /// Logs and converts a validation outcome for `op`.
    fn validated<T>(&self, op: &str, result: Result<T, ValidationError>) -> RepoResult<T> {
        result.map_err(|err| {
            warn!(
                "event=resource_{op} module=repo status=rejected table={} error_code=validation_error error={}",
                self.descriptor.name(),
                err
            );
            RepoError::Validation(err)
        })
    }

    fn run(&self, op: &str, statement: &QueryStatement) -> RepoResult<StoreOutput> {
        let started_at = Instant::now();
        match self.store.execute_statement(statement, self.deadline) {
            Ok(output) => {
                debug!(
                    "event=resource_{op} module=repo status=ok table={} sql=\"{}\" param_count={} row_count={} duration_ms={}",
                    self.descriptor.name(),
                    statement.text,
                    statement.params.len(),
                    output.row_count,
                    started_at.elapsed().as_millis()
                );
                Ok(output)
            }
            Err(err) => {
                let err = classify_store_error(self.descriptor.name(), err);
                error!(
                    "event=resource_{op} module=repo status=error table={} verb={} error_code={} duration_ms={} error={}",
                    self.descriptor.name(),
                    statement.verb(),
                    err.code(),
                    started_at.elapsed().as_millis(),
                    single_line(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
                );
                Err(err)
            }
        }
    }

    fn record(&self, row: Row) -> RepoResult<GenericRecord> {
        GenericRecord::from_row(&self.descriptor, row).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "row from `{}` lacks primary key `{}`",
                self.descriptor.name(),
                self.descriptor.primary_key()
            ))
        })
    }
}

impl<S: Store> ResourceRepository for Resource<S> {
    fn find(
        &self,
        filters: &FilterMap,
        sort: &SortRequest,
        page: &PageRequest,
    ) -> RepoResult<Vec<GenericRecord>> {
        let predicates = self.validated("find", translate(&self.descriptor, filters))?;
        let sort = normalize_sort(&self.descriptor, sort);
        let page = normalize_page(page);
        let statement = self.validated(
            "find",
            build_select(&self.descriptor, &predicates, &sort, &page),
        )?;

        let output = self.run("find", &statement)?;
        output
            .rows
            .into_iter()
            .map(|row| self.record(row))
            .collect()
    }

    fn find_one(&self, id: &Value) -> RepoResult<Option<GenericRecord>> {
        let statement = self.validated("find_one", build_find_one(&self.descriptor, id))?;
        let output = self.run("find_one", &statement)?;
        output
            .rows
            .into_iter()
            .next()
            .map(|row| self.record(row))
            .transpose()
    }

    fn count(&self, filters: &FilterMap) -> RepoResult<u64> {
        let predicates = self.validated("count", translate(&self.descriptor, filters))?;
        let statement = self.validated("count", build_count(&self.descriptor, &predicates))?;
        let output = self.run("count", &statement)?;

        let count = output
            .rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(Value::as_integer)
            .ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "count over `{}` returned no integer",
                    self.descriptor.name()
                ))
            })?;
        u64::try_from(count).map_err(|_| {
            RepoError::InvalidData(format!(
                "count over `{}` returned negative value {count}",
                self.descriptor.name()
            ))
        })
    }

    fn create(&self, payload: &Payload) -> RepoResult<GenericRecord> {
        match self.descriptor.key_generation() {
            KeyGeneration::Store => self.insert(payload, None),
            KeyGeneration::UuidV4 => self.insert(payload, Some(&Value::from(Uuid::new_v4()))),
        }
    }

    fn create_with_id(&self, id: &Value, payload: &Payload) -> RepoResult<GenericRecord> {
        self.insert(payload, Some(id))
    }

    fn update(&self, id: &Value, payload: &Payload) -> RepoResult<Option<GenericRecord>> {
        let statement = self.validated("update", build_update(&self.descriptor, id, payload))?;
        let output = self.run("update", &statement)?;
        output
            .rows
            .into_iter()
            .next()
            .map(|row| self.record(row))
            .transpose()
    }

    fn delete(&self, id: &Value) -> RepoResult<Option<Value>> {
        let statement = self.validated("delete", build_delete(&self.descriptor, id))?;
        let output = self.run("delete", &statement)?;
        if output.row_count == 0 {
            return Ok(None);
        }
        Ok(Some(id.clone()))
    }
}

/// Splits constraint rejections out of generic store failures.
fn classify_store_error(table: &str, err: DbError) -> RepoError {
    if let DbError::Sqlite(rusqlite::Error::SqliteFailure(inner, message)) = &err {
        if inner.code == ErrorCode::ConstraintViolation {
            let message = message.clone().unwrap_or_else(|| inner.to_string());
            return RepoError::ConstraintViolation {
                table: table.to_string(),
                constraint: constraint_name(&message),
                message,
            };
        }
    }

    RepoError::Adapter {
        table: table.to_string(),
        source: err,
    }
}

/// Extracts the constraint target from SQLite messages such as
/// `UNIQUE constraint failed: newsletter.email`.
fn constraint_name(message: &str) -> Option<String> {
    let (_, detail) = message.split_once("constraint failed:")?;
    let detail = detail.trim();
    if detail.is_empty() {
        return None;
    }
    Some(detail.to_string())
}
