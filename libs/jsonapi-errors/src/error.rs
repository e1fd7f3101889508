//! The error value propagated by every engine operation

use http::StatusCode;

use crate::catalog::ErrorKind;
use crate::document::ErrorDocument;
use crate::object::ErrorObject;

/// A taxonomy failure carrying one or more error objects.
///
/// The kind decides the response status; the objects are rendered verbatim
/// into the `errors` array, which allows several validation problems to be
/// reported by a single response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonApiError {
    kind: ErrorKind,
    errors: Vec<ErrorObject>,
}

impl JsonApiError {
    /// Error carrying the kind's default object (title, status and parameter source).
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            errors: vec![kind.def().default_object()],
        }
    }

    #[must_use]
    pub fn from_message(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            errors: vec![kind.def().as_object(detail)],
        }
    }

    #[must_use]
    pub fn from_pointer_and_message(
        kind: ErrorKind,
        pointer: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            errors: vec![kind.def().as_object(detail).with_pointer(pointer)],
        }
    }

    #[must_use]
    pub fn from_parameter_and_message(
        kind: ErrorKind,
        parameter: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            errors: vec![kind.def().as_object(detail).with_parameter(parameter)],
        }
    }

    /// Aggregate several objects under one kind. An empty list falls back to the
    /// kind's default object so a response never carries an empty `errors` array.
    #[must_use]
    pub fn with_errors(kind: ErrorKind, errors: Vec<ErrorObject>) -> Self {
        if errors.is_empty() {
            return Self::new(kind);
        }
        Self { kind, errors }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    #[must_use]
    pub fn errors(&self) -> &[ErrorObject] {
        &self.errors
    }

    #[must_use]
    pub fn into_document(self) -> ErrorDocument {
        ErrorDocument::new(self.errors)
    }
}

impl std::fmt::Display for JsonApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(detail) = self.errors.first().and_then(|e| e.detail.as_deref()) {
            write!(f, ": {detail}")?;
        }
        if self.errors.len() > 1 {
            write!(f, " (+{} more)", self.errors.len() - 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for JsonApiError {}

impl From<ErrorKind> for JsonApiError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Axum integration: render the error document with the JSON:API media type
#[cfg(feature = "axum")]
impl axum::response::IntoResponse for JsonApiError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::HeaderValue;

        let status = self.status();
        let mut resp = axum::Json(self.into_document()).into_response();
        *resp.status_mut() = status;
        resp.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static(crate::document::APPLICATION_VND_API_JSON),
        );
        resp
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn kind_only_error_has_default_object() {
        let err = JsonApiError::new(ErrorKind::ObjectNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.errors().len(), 1);
        assert_eq!(err.errors()[0].title, "Object not found");
        assert_eq!(err.to_string(), "Object not found");
    }

    #[test]
    fn pointer_and_message() {
        let err = JsonApiError::from_pointer_and_message(
            ErrorKind::InvalidType,
            "/data/type",
            "Invalid type. Expected \"student\".",
        );
        let doc = serde_json::to_value(err.clone().into_document()).unwrap();
        assert_eq!(doc["errors"][0]["status"], "409");
        assert_eq!(doc["errors"][0]["source"]["pointer"], "/data/type");
        assert_eq!(doc["jsonapi"]["version"], "1.0");
        assert_eq!(
            err.to_string(),
            "Invalid type: Invalid type. Expected \"student\"."
        );
    }

    #[test]
    fn aggregates_multiple_objects() {
        let def = ErrorKind::BadRequest.def();
        let err = JsonApiError::with_errors(
            ErrorKind::BadRequest,
            vec![
                def.as_object("Missing data for required field.")
                    .with_pointer("/data/attributes/name"),
                def.as_object("Not a valid integer.")
                    .with_pointer("/data/attributes/age"),
            ],
        );
        assert_eq!(err.errors().len(), 2);
        assert!(err.to_string().ends_with("(+1 more)"));
    }

    #[test]
    fn empty_aggregate_falls_back_to_default() {
        let err = JsonApiError::with_errors(ErrorKind::ValidationError, Vec::new());
        assert_eq!(err.errors().len(), 1);
        assert_eq!(err.errors()[0].status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn parameter_override() {
        let err = JsonApiError::from_parameter_and_message(
            ErrorKind::BadRequest,
            "page[size]",
            "Page size must be greater than 0",
        );
        let source = err.errors()[0].source.clone().unwrap();
        assert_eq!(source.parameter.as_deref(), Some("page[size]"));
        assert!(source.pointer.is_none());
    }
}
