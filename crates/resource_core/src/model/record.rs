//! Generic row representation returned by resource operations.

use crate::model::descriptor::TableDescriptor;
use crate::model::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;

/// Column name to value mapping for filters.
pub type FilterMap = BTreeMap<String, Value>;
/// Column name to value mapping for create/update bodies.
pub type Payload = BTreeMap<String, Value>;
/// One raw row as produced by a store.
pub type Row = BTreeMap<String, Value>;

/// One row of a described table.
///
/// `fields` carries the primary key plus every declared column the row
/// contains; store columns the descriptor does not declare are dropped.
/// Integers in boolean columns come back as `Value::Bool`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericRecord {
    pub id: Value,
    pub fields: BTreeMap<String, Value>,
}

impl GenericRecord {
    /// Projects a raw store row through `descriptor`.
    ///
    /// Returns `None` when the row lacks the primary key column.
    pub fn from_row(descriptor: &TableDescriptor, mut row: Row) -> Option<Self> {
        let id = row.get(descriptor.primary_key())?.clone();
        row.retain(|column, _| descriptor.readable_column(column).is_some());
        for (column, value) in row.iter_mut() {
            if let Value::Integer(raw) = *value {
                if descriptor.is_boolean(column) {
                    *value = Value::Bool(raw != 0);
                }
            }
        }
        Some(Self { id, fields: row })
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }
}
