//! Static table declarations.
//!
//! # Responsibility
//! - Declare the table name, primary key and columns an adapter may touch.
//! - Validate declarations once, at construction.
//!
//! # Invariants
//! - Every identifier matches `^[A-Za-z_][A-Za-z0-9_]*$` (max 63 chars).
//! - The primary key is not repeated in `columns`.
//! - Sortable fields are declared columns or the primary key.
//! - The default sort field is sortable.
//! - Boolean columns and the touch column are declared columns.
//! - A descriptor is immutable after construction.

use crate::query::page::{SortDirection, SortSpec};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid identifier regex"));

const DEFAULT_PRIMARY_KEY: &str = "id";

/// Returns whether `name` is safe to splice into statement text as an identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Who produces primary-key values on insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyGeneration {
    /// The store fills the key (column default, rowid alias, trigger).
    #[default]
    Store,
    /// The adapter binds a fresh UUIDv4 text key on insert.
    UuidV4,
}

/// Declaration-time failure for a [`TableDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    InvalidIdentifier { role: &'static str, name: String },
    NoColumns { table: String },
    DuplicateColumn { table: String, column: String },
    PrimaryKeyListedAsColumn { table: String, column: String },
    UnknownSortField { table: String, field: String },
    UnsortableDefault { table: String, field: String },
    /// A boolean or touch column that is not among `columns`.
    UndeclaredColumn {
        table: String,
        role: &'static str,
        column: String,
    },
}

impl Display for DescriptorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier { role, name } => {
                write!(f, "invalid {role} identifier `{name}`")
            }
            Self::NoColumns { table } => write!(f, "table `{table}` declares no columns"),
            Self::DuplicateColumn { table, column } => {
                write!(f, "table `{table}` declares column `{column}` twice")
            }
            Self::PrimaryKeyListedAsColumn { table, column } => write!(
                f,
                "table `{table}` lists primary key `{column}` among regular columns"
            ),
            Self::UnknownSortField { table, field } => write!(
                f,
                "table `{table}` marks undeclared column `{field}` as sortable"
            ),
            Self::UnsortableDefault { table, field } => write!(
                f,
                "table `{table}` default sort field `{field}` is not sortable"
            ),
            Self::UndeclaredColumn {
                table,
                role,
                column,
            } => write!(
                f,
                "table `{table}` marks undeclared column `{column}` as {role}"
            ),
        }
    }
}

impl Error for DescriptorError {}

/// Trusted, immutable declaration of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DescriptorDecl")]
pub struct TableDescriptor {
    name: String,
    primary_key: String,
    columns: BTreeSet<String>,
    sortable: BTreeSet<String>,
    default_sort: SortSpec,
    key_generation: KeyGeneration,
    boolean_columns: BTreeSet<String>,
    #[serde(rename = "touch_on_update")]
    touch_column: Option<String>,
}

impl TableDescriptor {
    /// Starts a descriptor declaration for `name`.
    ///
    /// Defaults: primary key `id`, store-generated keys, sortable set `{id}`,
    /// default sort `id DESC`.
    pub fn builder(name: impl Into<String>) -> TableDescriptorBuilder {
        TableDescriptorBuilder {
            decl: DescriptorDecl {
                name: name.into(),
                primary_key: DEFAULT_PRIMARY_KEY.to_string(),
                columns: Vec::new(),
                sortable: Vec::new(),
                default_sort: None,
                key_generation: KeyGeneration::Store,
                boolean_columns: Vec::new(),
                touch_on_update: None,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Declared non-key columns, in ascending order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn default_sort(&self) -> &SortSpec {
        &self.default_sort
    }

    pub fn key_generation(&self) -> KeyGeneration {
        self.key_generation
    }

    /// Returns whether `column` stores `0/1` that reads back as `Value::Bool`.
    pub fn is_boolean(&self, column: &str) -> bool {
        self.boolean_columns.contains(column)
    }

    /// Column set to `CURRENT_TIMESTAMP` by every update that does not set it.
    pub fn touch_column(&self) -> Option<&str> {
        self.touch_column.as_deref()
    }

    /// Exact, case-sensitive lookup among declared non-key columns.
    ///
    /// Returns the descriptor-owned spelling so callers never splice the
    /// caller's string into SQL.
    pub fn column(&self, name: &str) -> Option<&str> {
        self.columns.get(name).map(String::as_str)
    }

    /// Like [`Self::column`], but also accepts the primary key.
    pub fn readable_column(&self, name: &str) -> Option<&str> {
        if name == self.primary_key {
            return Some(self.primary_key.as_str());
        }
        self.column(name)
    }

    /// Exact lookup among sortable fields.
    pub fn sortable_field(&self, name: &str) -> Option<&str> {
        self.sortable.get(name).map(String::as_str)
    }
}

/// Builder for [`TableDescriptor`]; validation happens in [`Self::build`].
#[derive(Debug, Clone)]
pub struct TableDescriptorBuilder {
    decl: DescriptorDecl,
}

impl TableDescriptorBuilder {
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.decl.primary_key = column.into();
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.decl.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn sortable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.decl.sortable.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn default_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.decl.default_sort = Some(SortSpec::new(field, direction));
        self
    }

    pub fn key_generation(mut self, key_generation: KeyGeneration) -> Self {
        self.decl.key_generation = key_generation;
        self
    }

    /// Declares columns whose `0/1` integers are booleans.
    pub fn boolean_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.decl
            .boolean_columns
            .extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn touch_on_update(mut self, column: impl Into<String>) -> Self {
        self.decl.touch_on_update = Some(column.into());
        self
    }

    pub fn build(self) -> Result<TableDescriptor, DescriptorError> {
        TableDescriptor::try_from(self.decl)
    }
}

/// Serialized/declared shape before validation.
#[derive(Debug, Clone, Deserialize)]
struct DescriptorDecl {
    name: String,
    #[serde(default = "default_primary_key")]
    primary_key: String,
    columns: Vec<String>,
    #[serde(default)]
    sortable: Vec<String>,
    #[serde(default)]
    default_sort: Option<SortSpec>,
    #[serde(default)]
    key_generation: KeyGeneration,
    #[serde(default)]
    boolean_columns: Vec<String>,
    #[serde(default)]
    touch_on_update: Option<String>,
}

fn default_primary_key() -> String {
    DEFAULT_PRIMARY_KEY.to_string()
}

impl TryFrom<DescriptorDecl> for TableDescriptor {
    type Error = DescriptorError;

    fn try_from(decl: DescriptorDecl) -> Result<Self, Self::Error> {
        require_identifier("table", &decl.name)?;
        require_identifier("primary key", &decl.primary_key)?;

        if decl.columns.is_empty() {
            return Err(DescriptorError::NoColumns { table: decl.name });
        }

        let mut columns = BTreeSet::new();
        for column in decl.columns {
            require_identifier("column", &column)?;
            if column == decl.primary_key {
                return Err(DescriptorError::PrimaryKeyListedAsColumn {
                    table: decl.name,
                    column,
                });
            }
            if columns.contains(&column) {
                return Err(DescriptorError::DuplicateColumn {
                    table: decl.name,
                    column,
                });
            }
            columns.insert(column);
        }

        let mut sortable = BTreeSet::new();
        sortable.insert(decl.primary_key.clone());
        for field in decl.sortable {
            if field != decl.primary_key && !columns.contains(&field) {
                return Err(DescriptorError::UnknownSortField {
                    table: decl.name,
                    field,
                });
            }
            sortable.insert(field);
        }

        let default_sort = decl
            .default_sort
            .unwrap_or_else(|| SortSpec::new(decl.primary_key.clone(), SortDirection::Desc));
        if !sortable.contains(&default_sort.field) {
            return Err(DescriptorError::UnsortableDefault {
                table: decl.name,
                field: default_sort.field,
            });
        }

        let mut boolean_columns = BTreeSet::new();
        for column in decl.boolean_columns {
            require_declared(&decl.name, &columns, "boolean", &column)?;
            boolean_columns.insert(column);
        }
        if let Some(column) = &decl.touch_on_update {
            require_declared(&decl.name, &columns, "touch-on-update", column)?;
        }

        Ok(Self {
            name: decl.name,
            primary_key: decl.primary_key,
            columns,
            sortable,
            default_sort,
            key_generation: decl.key_generation,
            boolean_columns,
            touch_column: decl.touch_on_update,
        })
    }
}

fn require_declared(
    table: &str,
    columns: &BTreeSet<String>,
    role: &'static str,
    column: &str,
) -> Result<(), DescriptorError> {
    if columns.contains(column) {
        return Ok(());
    }
    Err(DescriptorError::UndeclaredColumn {
        table: table.to_string(),
        role,
        column: column.to_string(),
    })
}

fn require_identifier(role: &'static str, name: &str) -> Result<(), DescriptorError> {
    if is_valid_identifier(name) {
        return Ok(());
    }
    Err(DescriptorError::InvalidIdentifier {
        role,
        name: name.to_string(),
    })
}
