//! JSON:API error objects (pure data model, no HTTP framework dependencies)

use http::StatusCode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// JSON:API carries the status as a string member.
#[allow(clippy::trivially_copy_pass_by_ref)] // serde requires &T signature
fn serialize_status_code<S>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(status.as_str())
}

fn deserialize_status_code<'de, D>(deserializer: D) -> Result<StatusCode, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    StatusCode::from_bytes(raw.as_bytes()).map_err(serde::de::Error::custom)
}

/// Where in the request an error originated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSource {
    /// JSON pointer into the request document, e.g. `/data/attributes/age`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    /// Name of the offending query-string parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

impl ErrorSource {
    pub fn pointer(pointer: impl Into<String>) -> Self {
        Self {
            pointer: Some(pointer.into()),
            parameter: None,
        }
    }

    pub fn parameter(parameter: impl Into<String>) -> Self {
        Self {
            pointer: None,
            parameter: Some(parameter.into()),
        }
    }
}

/// One entry of the `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct ErrorObject {
    pub title: String,
    #[serde(
        serialize_with = "serialize_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    pub status: StatusCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
}

impl ErrorObject {
    pub fn new(status: StatusCode, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status,
            detail: None,
            source: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.source = Some(ErrorSource::pointer(pointer));
        self
    }

    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.source = Some(ErrorSource::parameter(parameter));
        self
    }

    /// Pointer of the source, if any
    #[must_use]
    pub fn pointer(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.pointer.as_deref())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_as_string() {
        let object = ErrorObject::new(StatusCode::NOT_FOUND, "Object not found");
        let json = serde_json::to_value(&object).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"title": "Object not found", "status": "404"})
        );
    }

    #[test]
    fn source_members_are_omitted_when_absent() {
        let object = ErrorObject::new(StatusCode::BAD_REQUEST, "Bad request")
            .with_detail("Not a valid integer.")
            .with_pointer("/data/attributes/age");
        let json = serde_json::to_value(&object).unwrap();
        assert_eq!(
            json["source"],
            serde_json::json!({"pointer": "/data/attributes/age"})
        );
        assert_eq!(object.pointer(), Some("/data/attributes/age"));
    }

    #[test]
    fn deserializes_string_status() {
        let json = r#"{"title":"Invalid type","status":"409","source":{"pointer":"/data/type"}}"#;
        let object: ErrorObject = serde_json::from_str(json).unwrap();
        assert_eq!(object.status, StatusCode::CONFLICT);
        assert_eq!(object.pointer(), Some("/data/type"));
        assert!(object.detail.is_none());
    }
}
