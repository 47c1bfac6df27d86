//! Filter map translation into bound predicates.
//!
//! # Invariants
//! - Keys are visited in ascending order, so equal inputs give equal SQL.
//! - One predicate per non-absent entry; `clauses.len() == params.len()`.
//! - Clause `i` (0-based) references placeholder `?{i + 1}` and `params[i]`.
//! - An undeclared key fails the whole translation, even when its value is
//!   absent.

use crate::model::descriptor::TableDescriptor;
use crate::model::record::FilterMap;
use crate::model::value::Value;
use crate::query::ident::{validate_filter_column, ValidationError};

/// Caller-side wildcard meaning "any sequence".
pub const WILDCARD: char = '*';
const LIKE_ESCAPE: char = '\\';

/// Translated `WHERE` predicates and their bound values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicates {
    pub clauses: Vec<String>,
    pub params: Vec<Value>,
}

impl Predicates {
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }
}

/// Translates `filters` into predicates against `descriptor`.
///
/// Text containing [`WILDCARD`] becomes a `LIKE` pattern; `%`, `_` and `\`
/// in the caller's text are escaped so they match literally.
///
/// Matching is case-insensitive for ASCII letters only: SQLite's built-in
/// `LIKE` (and `lower()`) leave non-ASCII characters as-is, so `"é*"` does
/// not match `"É"`.
pub fn translate(
    descriptor: &TableDescriptor,
    filters: &FilterMap,
) -> Result<Predicates, ValidationError> {
    let mut predicates = Predicates::default();

    for (key, value) in filters {
        let column = validate_filter_column(descriptor, key)?;
        if value.is_absent() {
            continue;
        }
        let placeholder = predicates.params.len() + 1;

        match value.as_text() {
            Some(text) if text.contains(WILDCARD) => {
                predicates
                    .clauses
                    .push(format!("{column} LIKE ?{placeholder} ESCAPE '\\'"));
                predicates.params.push(Value::Text(wildcard_to_like(text)));
            }
            _ => {
                predicates.clauses.push(format!("{column} = ?{placeholder}"));
                predicates.params.push(value.clone());
            }
        }
    }

    Ok(predicates)
}

/// Converts a caller wildcard pattern to an escaped `LIKE` pattern.
pub fn wildcard_to_like(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    for ch in pattern.chars() {
        match ch {
            WILDCARD => out.push('%'),
            '%' | '_' | LIKE_ESCAPE => {
                out.push(LIKE_ESCAPE);
                out.push(ch);
            }
            other => out.push(other),
        }
    }
    out
}
