//! Top-level document members shared by success and error responses

use serde::{Deserialize, Serialize};

use crate::object::ErrorObject;

/// Media type of every JSON:API document.
pub const APPLICATION_VND_API_JSON: &str = "application/vnd.api+json";

/// Protocol version advertised in the `jsonapi` member.
pub const JSONAPI_VERSION: &str = "1.0";

/// The `jsonapi` top-level member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonApiInfo {
    pub version: String,
}

impl Default for JsonApiInfo {
    fn default() -> Self {
        Self {
            version: JSONAPI_VERSION.to_owned(),
        }
    }
}

/// `{"errors": [...], "jsonapi": {"version": "1.0"}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub errors: Vec<ErrorObject>,
    #[serde(default)]
    pub jsonapi: JsonApiInfo,
}

impl ErrorDocument {
    #[must_use]
    pub fn new(errors: Vec<ErrorObject>) -> Self {
        Self {
            errors,
            jsonapi: JsonApiInfo::default(),
        }
    }
}
