#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Query-string side of the JSON:API engine.
//!
//! `QueryOptions::parse` turns the raw `fields[..]`, `include`, `sort`,
//! `filter` and `page[..]` parameters into validated options; the
//! `pagination` module turns a window plus a total count into navigation links.
pub mod catalog;
pub mod error_mapping;
pub mod filter;
pub mod limits;
pub mod pagination;
pub mod parse;

use std::collections::{BTreeMap, BTreeSet};

pub use catalog::ResourceCatalog;
pub use filter::{FilterClause, FilterOp, compare_json};
pub use limits::QueryLimits;
pub use pagination::{PaginationLinks, pagination_links};

/// Direction of one `sort` key; `-field` is descending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    #[must_use]
    pub fn is_ascending(self) -> bool {
        matches!(self, SortDir::Asc)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub dir: SortDir,
}

impl SortKey {
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            dir: SortDir::Asc,
        }
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            dir: SortDir::Desc,
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.dir {
            SortDir::Asc => f.write_str(&self.field),
            SortDir::Desc => write!(f, "-{}", self.field),
        }
    }
}

/// Zero-based page window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub number: u64,
    pub size: u64,
}

impl Pagination {
    pub const DEFAULT_SIZE: u64 = 10;

    #[must_use]
    pub fn new(number: u64, size: u64) -> Self {
        Self { number, size }
    }

    /// Number of items preceding this page
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.number.saturating_mul(self.size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            number: 0,
            size: Self::DEFAULT_SIZE,
        }
    }
}

/// Canonical, validated representation of the query string.
#[derive(Clone, Debug, Default, PartialEq)]
#[must_use]
pub struct QueryOptions {
    /// Sparse fieldsets keyed by resource type
    pub fields: BTreeMap<String, BTreeSet<String>>,
    /// Dot-separated relationship paths, in request order, without duplicates
    pub include: Vec<String>,
    pub sort: Vec<SortKey>,
    pub filters: Vec<FilterClause>,
    pub pagination: Pagination,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields<I, S>(mut self, resource_type: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.insert(
            resource_type.into(),
            fields.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn with_include(mut self, path: impl Into<String>) -> Self {
        self.include.push(path.into());
        self
    }

    pub fn with_sort(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn with_filter(mut self, clause: FilterClause) -> Self {
        self.filters.push(clause);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// Fieldset requested for `resource_type`, `None` meaning "all fields"
    #[must_use]
    pub fn fieldset(&self, resource_type: &str) -> Option<&BTreeSet<String>> {
        self.fields.get(resource_type)
    }

    /// Whether any include path starts with the given relationship
    #[must_use]
    pub fn includes(&self, relationship: &str) -> bool {
        self.include
            .iter()
            .any(|path| path.split('.').next() == Some(relationship))
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid fields: {0}")]
    InvalidFields(String),

    #[error("invalid include: {0}")]
    InvalidInclude(String),

    #[error("invalid sort: {0}")]
    InvalidSort(String),

    #[error("invalid filters: {0}")]
    InvalidFilters(String),

    #[error("invalid {parameter}: {detail}")]
    InvalidPage { parameter: String, detail: String },
}
