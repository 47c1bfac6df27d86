//! Sort and pagination normalization.
//!
//! # Responsibility
//! - Coerce free-form sort/page requests into bounded, validated specs.
//!
//! # Invariants
//! - Both normalizers are total: they coerce, they never fail.
//! - A sort field outside the descriptor's sortable set is never returned.
//! - `PageSpec::limit` never exceeds [`MAX_LIMIT`].

use crate::model::descriptor::TableDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Hard ceiling on rows returned by one `find` call.
pub const MAX_LIMIT: u32 = 100;
/// Limit used when the caller sends none or garbage.
pub const DEFAULT_LIMIT: u32 = 20;
/// Offset used when the caller sends none or garbage.
pub const DEFAULT_OFFSET: u32 = 0;

/// Sort direction keyword. The only non-identifier token sort adds to SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// SQL keyword for this direction.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// `Asc` only for exactly `asc` in any letter case; everything else,
    /// including padded text such as `" asc "`, is `Desc`.
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }
}

impl Display for SortDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Validated sort: field is a sortable identifier of the target table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Untrusted sort request as it arrives from a controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRequest {
    #[serde(default, alias = "sortBy")]
    pub field: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
}

impl SortRequest {
    pub fn new(field: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            direction: Some(direction.into()),
        }
    }
}

/// Validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    pub limit: u32,
    pub offset: u32,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: DEFAULT_OFFSET,
        }
    }
}

/// One raw pagination input: query strings arrive as text, JSON bodies as numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageInput {
    Integer(i64),
    Text(String),
}

impl PageInput {
    fn parse(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Text(text) => text.trim().parse::<i64>().ok(),
        }
    }
}

impl From<i64> for PageInput {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for PageInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PageInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Untrusted page request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub limit: Option<PageInput>,
    #[serde(default)]
    pub offset: Option<PageInput>,
}

impl PageRequest {
    pub fn new(limit: impl Into<PageInput>, offset: impl Into<PageInput>) -> Self {
        Self {
            limit: Some(limit.into()),
            offset: Some(offset.into()),
        }
    }
}

/// Resolves a requested sort against the descriptor's sortable set.
///
/// Absent or non-sortable fields fall back to the descriptor default sort,
/// including its direction.
pub fn normalize_sort(descriptor: &TableDescriptor, requested: &SortRequest) -> SortSpec {
    let Some(field) = requested
        .field
        .as_deref()
        .and_then(|name| descriptor.sortable_field(name))
    else {
        return descriptor.default_sort().clone();
    };

    let direction = requested
        .direction
        .as_deref()
        .map_or(SortDirection::Desc, SortDirection::parse_lenient);

    SortSpec::new(field, direction)
}

/// Coerces a raw page request into `[0, MAX_LIMIT]` / non-negative offset.
pub fn normalize_page(requested: &PageRequest) -> PageSpec {
    let limit = match requested.limit.as_ref().and_then(PageInput::parse) {
        Some(value) if value >= 0 => clamp_to_u32(value).min(MAX_LIMIT),
        _ => DEFAULT_LIMIT,
    };
    let offset = match requested.offset.as_ref().and_then(PageInput::parse) {
        Some(value) if value >= 0 => clamp_to_u32(value),
        _ => DEFAULT_OFFSET,
    };

    PageSpec { limit, offset }
}

fn clamp_to_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
