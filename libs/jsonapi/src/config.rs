//! Engine configuration.

use jsonapi_query::QueryLimits;
use serde::{Deserialize, Serialize};

/// How a successful DELETE on a single resource is answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteResponse {
    /// 200 with `{"meta": {"message": "Object successfully deleted"}}`
    #[default]
    Confirmation,
    /// 204 without body
    NoContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct JsonApiConfig {
    /// Prefix every bound URL is mounted under. Default: `/api`
    pub base_path: String,
    /// Page size used when `page[size]` is absent. Default: 10
    pub default_page_size: u64,
    /// Largest accepted `page[size]`. Default: 1000
    pub max_page_size: u64,
    /// Largest number of `sort` keys. Default: 5
    pub max_sort_fields: usize,
    /// Longest accepted `filter` parameter, in characters. Default: 2000
    pub max_filter_length: usize,
    /// Deepest accepted `include` path, in segments. Default: 3
    pub max_include_depth: usize,
    pub delete_response: DeleteResponse,
}

impl Default for JsonApiConfig {
    fn default() -> Self {
        let limits = QueryLimits::default();
        Self {
            base_path: "/api".to_owned(),
            default_page_size: limits.default_page_size,
            max_page_size: limits.max_page_size,
            max_sort_fields: limits.max_sort_fields,
            max_filter_length: limits.max_filter_length,
            max_include_depth: limits.max_include_depth,
            delete_response: DeleteResponse::default(),
        }
    }
}

impl JsonApiConfig {
    #[must_use]
    pub fn limits(&self) -> QueryLimits {
        QueryLimits::new()
            .with_default_page_size(self.default_page_size)
            .with_max_page_size(self.max_page_size)
            .with_max_sort_fields(self.max_sort_fields)
            .with_max_filter_length(self.max_filter_length)
            .with_max_include_depth(self.max_include_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = JsonApiConfig::default();
        assert_eq!(cfg.base_path, "/api");
        assert_eq!(cfg.default_page_size, 10);
        assert_eq!(cfg.delete_response, DeleteResponse::Confirmation);
        assert_eq!(cfg.limits(), QueryLimits::default());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let cfg: JsonApiConfig = serde_json::from_value(serde_json::json!({
            "base_path": "/api/v1",
            "delete_response": "no_content"
        }))
        .unwrap();
        assert_eq!(cfg.base_path, "/api/v1");
        assert_eq!(cfg.delete_response, DeleteResponse::NoContent);
        assert_eq!(cfg.max_page_size, 1000);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let res: Result<JsonApiConfig, _> =
            serde_json::from_value(serde_json::json!({"page_size": 5}));
        assert!(res.is_err());
    }
}
