use http::{Method, StatusCode};
use jsonapi_errors::{ErrorKind, JsonApiError};

use crate::schema::SchemaError;

/// Failure of a resource operation.
///
/// Only the `JsonApi` variant is rendered with an error document; the others
/// fall outside the JSON:API taxonomy and are answered with a bare status.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error(transparent)]
    JsonApi(#[from] JsonApiError),

    #[error("request body is not valid JSON: {0}")]
    MalformedBody(#[source] serde_json::Error),

    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ResourceError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::JsonApi(err) => err.status(),
            Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Kind of a taxonomy failure, `None` for bare-status failures
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::JsonApi(err) => Some(err.kind()),
            _ => None,
        }
    }

    #[must_use]
    pub fn object_not_found(detail: impl Into<String>) -> Self {
        JsonApiError::from_message(ErrorKind::ObjectNotFound, detail).into()
    }

    #[must_use]
    pub fn related_object_not_found(detail: impl Into<String>) -> Self {
        JsonApiError::from_message(ErrorKind::RelatedObjectNotFound, detail).into()
    }

    #[must_use]
    pub fn unable(detail: impl Into<String>) -> Self {
        JsonApiError::from_message(ErrorKind::Unable, detail).into()
    }

    #[must_use]
    pub fn bad_request(pointer: impl Into<String>, detail: impl Into<String>) -> Self {
        JsonApiError::from_pointer_and_message(ErrorKind::BadRequest, pointer, detail).into()
    }
}

impl From<jsonapi_query::Error> for ResourceError {
    fn from(err: jsonapi_query::Error) -> Self {
        Self::JsonApi(err.into())
    }
}

impl From<ErrorKind> for ResourceError {
    fn from(kind: ErrorKind) -> Self {
        Self::JsonApi(JsonApiError::new(kind))
    }
}

impl From<SchemaError> for ResourceError {
    fn from(err: SchemaError) -> Self {
        Self::Unexpected(err.into())
    }
}
