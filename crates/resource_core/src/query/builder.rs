//! Parameterized statement assembly.
//!
//! # Responsibility
//! - Produce `QueryStatement`s for select/count/insert/update/delete.
//!
//! # Invariants
//! - Statement text contains only descriptor identifiers, fixed keywords and
//!   `?N` placeholders; every caller value lands in `params`.
//! - Placeholder `?N` binds `params[N - 1]`.
//! - Mutation columns, placeholders and values are produced in one pass.
//! - The primary key is never taken from a payload.

use crate::model::descriptor::TableDescriptor;
use crate::model::record::Payload;
use crate::model::value::Value;
use crate::query::filter::Predicates;
use crate::query::ident::{validate_column, validate_table, ValidationError};
use crate::query::page::{PageSpec, SortDirection, SortSpec};

/// Statement text plus ordered bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryStatement {
    pub text: String,
    pub params: Vec<Value>,
}

impl QueryStatement {
    /// Leading SQL keyword, safe to log.
    pub fn verb(&self) -> &str {
        self.text.split_whitespace().next().unwrap_or("")
    }
}

/// `SELECT * ... ORDER BY ... LIMIT ?n OFFSET ?n+1`.
///
/// `sort.field` must come from [`crate::query::page::normalize_sort`].
/// Sorting on a non-key field appends `<pk> ASC` as a tie-breaker so pages
/// do not overlap.
pub fn build_select(
    descriptor: &TableDescriptor,
    predicates: &Predicates,
    sort: &SortSpec,
    page: &PageSpec,
) -> Result<QueryStatement, ValidationError> {
    let table = validate_table(descriptor)?;
    let sort_field = descriptor
        .sortable_field(&sort.field)
        .ok_or_else(|| ValidationError::UnknownColumn {
            table: table.to_string(),
            column: sort.field.clone(),
        })?;

    let mut text = format!("SELECT * FROM {table}");
    push_where(&mut text, predicates);

    text.push_str(&format!(" ORDER BY {sort_field} {}", sort.direction.as_sql()));
    if sort_field != descriptor.primary_key() {
        text.push_str(&format!(
            ", {} {}",
            descriptor.primary_key(),
            SortDirection::Asc.as_sql()
        ));
    }

    let mut params = predicates.params.clone();
    let limit_index = params.len() + 1;
    text.push_str(&format!(" LIMIT ?{limit_index} OFFSET ?{}", limit_index + 1));
    params.push(Value::Integer(i64::from(page.limit)));
    params.push(Value::Integer(i64::from(page.offset)));

    Ok(QueryStatement { text, params })
}

/// `SELECT COUNT(*) AS count ...` over the same predicates as `find`.
pub fn build_count(
    descriptor: &TableDescriptor,
    predicates: &Predicates,
) -> Result<QueryStatement, ValidationError> {
    let table = validate_table(descriptor)?;
    let mut text = format!("SELECT COUNT(*) AS count FROM {table}");
    push_where(&mut text, predicates);

    Ok(QueryStatement {
        text,
        params: predicates.params.clone(),
    })
}

/// `SELECT * ... WHERE <pk> = ?1`.
pub fn build_find_one(
    descriptor: &TableDescriptor,
    id: &Value,
) -> Result<QueryStatement, ValidationError> {
    let table = validate_table(descriptor)?;
    Ok(QueryStatement {
        text: format!(
            "SELECT * FROM {table} WHERE {} = ?1",
            descriptor.primary_key()
        ),
        params: vec![id.clone()],
    })
}

/// `INSERT ... RETURNING *`.
///
/// `explicit_id`, when given, is written to the primary key column ahead of
/// the payload columns. A payload entry named like the primary key is skipped.
pub fn build_insert(
    descriptor: &TableDescriptor,
    payload: &Payload,
    explicit_id: Option<&Value>,
) -> Result<QueryStatement, ValidationError> {
    let table = validate_table(descriptor)?;
    let assignments = writable_columns(descriptor, payload)?;

    let mut columns = Vec::with_capacity(assignments.len() + 1);
    let mut params = Vec::with_capacity(assignments.len() + 1);
    if let Some(id) = explicit_id {
        columns.push(descriptor.primary_key());
        params.push(id.clone());
    }
    for (column, value) in assignments {
        columns.push(column);
        params.push(value.clone());
    }

    let placeholders = (1..=params.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(QueryStatement {
        text: format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders}) RETURNING *",
            columns.join(", ")
        ),
        params,
    })
}

/// `UPDATE ... SET c1 = ?1, ... WHERE <pk> = ?k+1 RETURNING *`.
///
/// The descriptor's touch column, unless the payload sets it, is assigned
/// `CURRENT_TIMESTAMP` in the same statement so `RETURNING` sees it.
pub fn build_update(
    descriptor: &TableDescriptor,
    id: &Value,
    payload: &Payload,
) -> Result<QueryStatement, ValidationError> {
    let table = validate_table(descriptor)?;
    let assignments = writable_columns(descriptor, payload)?;

    let mut set_clauses = Vec::with_capacity(assignments.len());
    let mut params = Vec::with_capacity(assignments.len() + 1);
    for (column, value) in assignments {
        params.push(value.clone());
        set_clauses.push(format!("{column} = ?{}", params.len()));
    }
    if let Some(touch) = descriptor.touch_column() {
        if !payload.contains_key(touch) {
            set_clauses.push(format!("{touch} = CURRENT_TIMESTAMP"));
        }
    }
    params.push(id.clone());

    Ok(QueryStatement {
        text: format!(
            "UPDATE {table} SET {} WHERE {} = ?{} RETURNING *",
            set_clauses.join(", "),
            descriptor.primary_key(),
            params.len()
        ),
        params,
    })
}

/// `DELETE ... WHERE <pk> = ?1`. Always exactly one target row.
pub fn build_delete(
    descriptor: &TableDescriptor,
    id: &Value,
) -> Result<QueryStatement, ValidationError> {
    let table = validate_table(descriptor)?;
    Ok(QueryStatement {
        text: format!("DELETE FROM {table} WHERE {} = ?1", descriptor.primary_key()),
        params: vec![id.clone()],
    })
}

fn push_where(text: &mut String, predicates: &Predicates) {
    if predicates.is_empty() {
        return;
    }
    text.push_str(" WHERE ");
    text.push_str(&predicates.clauses.join(" AND "));
}

/// Validates payload keys, drops the primary key, rejects empty results.
fn writable_columns<'d, 'p>(
    descriptor: &'d TableDescriptor,
    payload: &'p Payload,
) -> Result<Vec<(&'d str, &'p Value)>, ValidationError> {
    let mut assignments = Vec::with_capacity(payload.len());
    for (key, value) in payload {
        if key == descriptor.primary_key() {
            continue;
        }
        assignments.push((validate_column(descriptor, key)?, value));
    }

    if assignments.is_empty() {
        return Err(ValidationError::EmptyPayload {
            table: descriptor.name().to_string(),
        });
    }
    Ok(assignments)
}
