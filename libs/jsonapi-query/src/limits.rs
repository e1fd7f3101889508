//! Input validation and safety limits for query-string parsing
//!
//! This module enforces sane caps to prevent abuse and resource exhaustion:
//! - Maximum `page[size]` value
//! - Maximum number of `sort` fields
//! - Maximum filter expression length
//! - Maximum depth of an `include` path

use crate::Error;

/// Default configuration for query-string limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryLimits {
    /// Page size used when `page[size]` is absent (default: 10)
    pub default_page_size: u64,
    /// Maximum value for `page[size]` (default: 1000)
    pub max_page_size: u64,
    /// Maximum number of fields in `sort` (default: 5)
    pub max_sort_fields: usize,
    /// Maximum length of a `filter` parameter in characters (default: 2000)
    pub max_filter_length: usize,
    /// Maximum number of segments in one `include` path (default: 3)
    pub max_include_depth: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 1000,
            max_sort_fields: 5,
            max_filter_length: 2000,
            max_include_depth: 3,
        }
    }
}

impl QueryLimits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_default_page_size(mut self, size: u64) -> Self {
        self.default_page_size = size;
        self
    }

    #[must_use]
    pub fn with_max_page_size(mut self, max: u64) -> Self {
        self.max_page_size = max;
        self
    }

    #[must_use]
    pub fn with_max_sort_fields(mut self, max: usize) -> Self {
        self.max_sort_fields = max;
        self
    }

    #[must_use]
    pub fn with_max_filter_length(mut self, max: usize) -> Self {
        self.max_filter_length = max;
        self
    }

    #[must_use]
    pub fn with_max_include_depth(mut self, max: usize) -> Self {
        self.max_include_depth = max;
        self
    }

    /// Validate a `page[size]` value against limits
    ///
    /// # Errors
    /// Returns `Error::InvalidPage` if the size is zero or above the maximum.
    pub fn validate_page_size(&self, size: u64) -> Result<(), Error> {
        if size == 0 {
            return Err(Error::InvalidPage {
                parameter: "page[size]".to_owned(),
                detail: "Page size must be greater than 0".to_owned(),
            });
        }
        if size > self.max_page_size {
            return Err(Error::InvalidPage {
                parameter: "page[size]".to_owned(),
                detail: format!("Page size exceeds the maximum of {}", self.max_page_size),
            });
        }
        Ok(())
    }

    /// Validate a `filter` parameter length
    ///
    /// # Errors
    /// Returns `Error::InvalidFilters` if the text is too long.
    pub fn validate_filter(&self, filter: &str) -> Result<(), Error> {
        if filter.chars().count() > self.max_filter_length {
            return Err(Error::InvalidFilters(format!(
                "Filter expression exceeds maximum length of {} characters",
                self.max_filter_length
            )));
        }
        Ok(())
    }

    /// Validate number of `sort` fields
    ///
    /// # Errors
    /// Returns `Error::InvalidSort` if there are too many keys.
    pub fn validate_sort_count(&self, count: usize) -> Result<(), Error> {
        if count > self.max_sort_fields {
            return Err(Error::InvalidSort(format!(
                "Too many sort fields (max: {})",
                self.max_sort_fields
            )));
        }
        Ok(())
    }

    /// Validate the depth of one `include` path
    ///
    /// # Errors
    /// Returns `Error::InvalidInclude` if the path is nested too deeply.
    pub fn validate_include_depth(&self, path: &str) -> Result<(), Error> {
        if path.split('.').count() > self.max_include_depth {
            return Err(Error::InvalidInclude(format!(
                "Include path \"{path}\" is nested deeper than {} levels",
                self.max_include_depth
            )));
        }
        Ok(())
    }
}
