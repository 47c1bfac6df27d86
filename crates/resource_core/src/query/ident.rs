//! Identifier whitelisting.
//!
//! Identifiers cannot be bound as parameters, so anything spliced into
//! statement text must come from the descriptor. These checks return the
//! descriptor-owned spelling, never the caller's string.

use crate::model::descriptor::{is_valid_identifier, TableDescriptor};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Caller input rejected before any statement is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    UnknownTable(String),
    UnknownColumn { table: String, column: String },
    EmptyPayload { table: String },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTable(table) => write!(f, "unknown table `{table}`"),
            Self::UnknownColumn { table, column } => {
                write!(f, "unknown column `{column}` for table `{table}`")
            }
            Self::EmptyPayload { table } => {
                write!(f, "payload for table `{table}` contains no writable columns")
            }
        }
    }
}

impl Error for ValidationError {}

/// Returns the descriptor's table name.
pub fn validate_table(descriptor: &TableDescriptor) -> Result<&str, ValidationError> {
    let name = descriptor.name();
    if is_valid_identifier(name) {
        Ok(name)
    } else {
        Err(ValidationError::UnknownTable(name.to_string()))
    }
}

/// Accepts only an exact member of the declared non-key columns.
pub fn validate_column<'d>(
    descriptor: &'d TableDescriptor,
    name: &str,
) -> Result<&'d str, ValidationError> {
    descriptor
        .column(name)
        .ok_or_else(|| unknown_column(descriptor, name))
}

/// Accepts a declared column or the primary key (filters may target either).
pub fn validate_filter_column<'d>(
    descriptor: &'d TableDescriptor,
    name: &str,
) -> Result<&'d str, ValidationError> {
    descriptor
        .readable_column(name)
        .ok_or_else(|| unknown_column(descriptor, name))
}

fn unknown_column(descriptor: &TableDescriptor, name: &str) -> ValidationError {
    ValidationError::UnknownColumn {
        table: descriptor.name().to_string(),
        column: name.to_string(),
    }
}
