//! axum routing glue: binds resources to URL patterns.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{Path, Request};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use http::header;
use http::request::Parts;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use url::Url;

use crate::auth::{Authenticator, NullAuthenticator};
use crate::config::JsonApiConfig;
use crate::error::ResourceError;
use crate::resource::{Resource, ResourceRequest};
use crate::response::JsonApiResponse;

/// Largest request body read into memory.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("URL \"{0}\" is already bound")]
    AlreadyBound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    List,
    Detail,
    Relationship,
}

/// Builder mounting resources under the configured base path.
///
/// Patterns use axum syntax (`/students/{id}`); each is served with and
/// without a trailing slash and accepts every method, leaving the verb check
/// to the resource.
pub struct JsonApiRouter {
    router: Router,
    config: JsonApiConfig,
    authenticator: Arc<dyn Authenticator>,
    bound: HashSet<String>,
}

impl JsonApiRouter {
    #[must_use]
    pub fn new(config: JsonApiConfig) -> Self {
        Self {
            router: Router::new(),
            config,
            authenticator: Arc::new(NullAuthenticator),
            bound: HashSet::new(),
        }
    }

    #[must_use]
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Bind a collection endpoint.
    ///
    /// # Errors
    /// `RouteError::AlreadyBound` if the URL is taken.
    pub fn list(self, path: &str, resource: Resource) -> Result<Self, RouteError> {
        self.bind(path, resource, Endpoint::List)
    }

    /// Bind a single-object endpoint; the pattern must capture the resource's
    /// URL field.
    ///
    /// # Errors
    /// `RouteError::AlreadyBound` if the URL is taken.
    pub fn detail(self, path: &str, resource: Resource) -> Result<Self, RouteError> {
        self.bind(path, resource, Endpoint::Detail)
    }

    /// Bind a relationship endpoint. The relationship is taken from a
    /// `{relation}` capture, or else from the last path segment.
    ///
    /// # Errors
    /// `RouteError::AlreadyBound` if the URL is taken.
    pub fn relationship(self, path: &str, resource: Resource) -> Result<Self, RouteError> {
        self.bind(path, resource, Endpoint::Relationship)
    }

    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }

    fn bind(mut self, path: &str, resource: Resource, endpoint: Endpoint) -> Result<Self, RouteError> {
        let full = join_path(&self.config.base_path, path);
        if !self.bound.insert(route_key(&full)) {
            return Err(RouteError::AlreadyBound(full));
        }

        let resource = Arc::new(resource.with_config(&self.config));
        let authenticator = self.authenticator.clone();
        tracing::debug!(
            path = %full,
            resource_type = %resource.schema_type(),
            ?endpoint,
            "binding resource"
        );

        let route = if endpoint == Endpoint::List {
            any(move |request: Request| {
                let resource = resource.clone();
                let authenticator = authenticator.clone();
                async move {
                    dispatch(endpoint, &resource, authenticator.as_ref(), BTreeMap::new(), request)
                        .await
                }
            })
        } else {
            any(move |Path(view_args): Path<BTreeMap<String, String>>, request: Request| {
                let resource = resource.clone();
                let authenticator = authenticator.clone();
                async move {
                    dispatch(endpoint, &resource, authenticator.as_ref(), view_args, request).await
                }
            })
        };

        let mut router = self.router.route(&full, route.clone());
        if full != "/" {
            router = router.route(&format!("{full}/"), route);
        }
        self.router = router;
        Ok(self)
    }
}

/// `base` + `path`, with exactly one leading slash and no trailing slash.
fn join_path(base: &str, path: &str) -> String {
    let joined: Vec<&str> = base
        .split('/')
        .chain(path.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect();
    format!("/{}", joined.join("/"))
}

/// Patterns differing only in capture names route identically.
fn route_key(path: &str) -> String {
    path.split('/')
        .map(|segment| if segment.starts_with('{') { "{}" } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}

async fn dispatch(
    endpoint: Endpoint,
    resource: &Resource,
    authenticator: &dyn Authenticator,
    view_args: BTreeMap<String, String>,
    request: Request,
) -> Response {
    match serve(endpoint, resource, authenticator, view_args, request).await {
        Ok(response) => response.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn serve(
    endpoint: Endpoint,
    resource: &Resource,
    authenticator: &dyn Authenticator,
    view_args: BTreeMap<String, String>,
    request: Request<Body>,
) -> Result<JsonApiResponse, ResourceError> {
    let (parts, body) = request.into_parts();
    let principal = authenticator.authenticate(&parts.headers).await?;
    let url = request_url(&parts)?;
    let body = Limited::new(body, MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|err| {
            if err.is::<LengthLimitError>() {
                ResourceError::PayloadTooLarge(MAX_BODY_BYTES)
            } else {
                ResourceError::Unexpected(anyhow::Error::msg(err))
            }
        })?
        .to_bytes();

    let req = ResourceRequest::new(parts.method, url)
        .with_view_args(view_args)
        .with_body(body)
        .with_principal(principal);

    match endpoint {
        Endpoint::List => resource.handle_list(&req).await,
        Endpoint::Detail => resource.handle_detail(&req).await,
        Endpoint::Relationship => resource.handle_relationship(&req).await,
    }
}

/// Absolute URL of the request, rebuilt from the `Host` header.
fn request_url(parts: &Parts) -> Result<Url, ResourceError> {
    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| parts.uri.authority().map(http::uri::Authority::as_str))
        .unwrap_or("localhost");
    let path_and_query = parts
        .uri
        .path_and_query()
        .map_or("/", |pq| pq.as_str());

    Url::parse(&format!("http://{host}{path_and_query}"))
        .map_err(|err| ResourceError::bad_request("/", format!("Invalid request URL: {err}")))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::schema::{SchemaDefinition, SchemaRegistry};
    use crate::storage::InMemoryStorage;

    fn resource() -> Resource {
        let mut registry = SchemaRegistry::new();
        registry.register(SchemaDefinition::new("student")).unwrap();
        let registry = Arc::new(registry);
        let storage = Arc::new(InMemoryStorage::new(registry.clone()));
        Resource::new(registry, "student", storage).unwrap()
    }

    #[test]
    fn paths_are_joined_under_base() {
        assert_eq!(join_path("/api", "/students"), "/api/students");
        assert_eq!(join_path("/api/", "students/"), "/api/students");
        assert_eq!(join_path("", "/students/{id}"), "/students/{id}");
        assert_eq!(join_path("/", "/"), "/");
    }

    #[test]
    fn binding_a_url_twice_fails() {
        let router = JsonApiRouter::new(JsonApiConfig::default())
            .list("/students", resource())
            .unwrap()
            .detail("/students/{id}", resource())
            .unwrap();

        let err = router.list("/students/", resource()).err().unwrap();
        assert_eq!(err, RouteError::AlreadyBound("/api/students".to_owned()));
    }

    #[test]
    fn capture_names_do_not_make_urls_distinct() {
        let router = JsonApiRouter::new(JsonApiConfig::default())
            .detail("/students/{id}", resource())
            .unwrap();
        let err = router.detail("/students/{student_id}", resource()).err().unwrap();
        assert_eq!(err, RouteError::AlreadyBound("/api/students/{student_id}".to_owned()));
    }

    #[tokio::test]
    async fn oversized_bodies_are_refused_without_a_document() {
        use tower::ServiceExt;

        let router = JsonApiRouter::new(JsonApiConfig::default())
            .list("/students", resource())
            .unwrap()
            .into_router();
        let resp = router
            .oneshot(
                http::Request::builder()
                    .method(http::Method::POST)
                    .uri("/api/students")
                    .body(Body::from(vec![b' '; MAX_BODY_BYTES + 1]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), http::StatusCode::PAYLOAD_TOO_LARGE);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[test]
    fn request_url_uses_host_header() {
        let (parts, ()) = http::Request::builder()
            .uri("/api/students?page%5Bsize%5D=5")
            .header(header::HOST, "example.org:8087")
            .body(())
            .unwrap()
            .into_parts();
        let url = request_url(&parts).unwrap();
        assert_eq!(url.as_str(), "http://example.org:8087/api/students?page%5Bsize%5D=5");
    }
}
