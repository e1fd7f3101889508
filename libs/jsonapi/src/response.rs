//! HTTP responses of the resource state machines.

use axum::response::{IntoResponse, Response};
use http::{HeaderValue, StatusCode, header};
use jsonapi_errors::APPLICATION_VND_API_JSON;
use serde_json::Value;

use crate::document::Document;
use crate::error::ResourceError;

/// Successful outcome of a resource operation.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonApiResponse {
    pub status: StatusCode,
    /// `Location` header, set on creation
    pub location: Option<String>,
    pub body: Option<Value>,
}

impl JsonApiResponse {
    /// 200 OK with a document
    #[must_use]
    pub fn ok(document: Document) -> Self {
        Self {
            status: StatusCode::OK,
            location: None,
            body: Some(document.into_value()),
        }
    }

    /// 201 Created, pointing at the new object, without a body
    #[must_use]
    pub fn created(location: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CREATED,
            location: Some(location.into()),
            body: None,
        }
    }

    /// 204 No Content
    #[must_use]
    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            location: None,
            body: None,
        }
    }
}

impl IntoResponse for JsonApiResponse {
    fn into_response(self) -> Response {
        let mut resp = match self.body {
            Some(body) => {
                let mut resp = axum::Json(body).into_response();
                resp.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static(APPLICATION_VND_API_JSON),
                );
                resp
            }
            None => ().into_response(),
        };
        *resp.status_mut() = self.status;

        if let Some(location) = self.location {
            match HeaderValue::try_from(location) {
                Ok(value) => {
                    resp.headers_mut().insert(header::LOCATION, value);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "dropping unrepresentable Location header");
                }
            }
        }
        resp
    }
}

impl IntoResponse for ResourceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "resource operation failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "resource operation rejected");
        }

        match self {
            Self::JsonApi(err) => err.into_response(),
            _ => status.into_response(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use http::Method;
    use http_body_util::BodyExt;
    use jsonapi_errors::ErrorKind;
    use serde_json::json;
    use tracing_test::traced_test;

    async fn body_bytes(resp: Response) -> bytes::Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn ok_carries_document_and_media_type() {
        let resp = JsonApiResponse::ok(Document::data(json!([]))).into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], APPLICATION_VND_API_JSON);

        let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(body, json!({"data": [], "jsonapi": {"version": "1.0"}}));
    }

    #[tokio::test]
    async fn created_sets_location_without_body() {
        let resp = JsonApiResponse::created("/api/students/0/").into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.headers()[header::LOCATION], "/api/students/0/");
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn taxonomy_errors_render_error_documents() {
        let resp = ResourceError::object_not_found("No \"student\" with id \"3\"").into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], APPLICATION_VND_API_JSON);

        let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(body["errors"][0]["status"], "404");
        assert_eq!(body["errors"][0]["title"], ErrorKind::ObjectNotFound.title());
    }

    #[tokio::test]
    async fn other_errors_are_bare_statuses() {
        let resp = ResourceError::MethodNotAllowed(Method::PUT).into_response();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(body_bytes(resp).await.is_empty());

        let resp = ResourceError::from(anyhow::anyhow!("disk on fire")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn failures_are_logged_by_severity() {
        drop(ResourceError::unable("store offline").into_response());
        assert!(logs_contain("resource operation failed"));

        drop(ResourceError::object_not_found("gone").into_response());
        assert!(logs_contain("resource operation rejected"));
    }
}
