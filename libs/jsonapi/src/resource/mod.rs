//! Resource state machines.
//!
//! A [`Resource`] binds one schema type to a [`Storage`] and answers the three
//! kinds of JSON:API endpoints: the collection ([`Resource::handle_list`]), a
//! single object ([`Resource::handle_detail`]) and one relationship of an
//! object ([`Resource::handle_relationship`]). Each handler is transport
//! agnostic: it takes a [`ResourceRequest`] and returns either a
//! [`JsonApiResponse`] or a [`ResourceError`] to be rendered at the boundary.

mod detail;
mod list;
mod relationship;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use jsonapi_query::{QueryLimits, QueryOptions};
use serde_json::Value;
use url::Url;

use crate::auth::Principal;
use crate::config::{DeleteResponse, JsonApiConfig};
use crate::derive::{DerivedSchema, SchemaMode};
use crate::error::ResourceError;
use crate::schema::{SchemaDefinition, SchemaError, SchemaRegistry};
use crate::storage::{RequestContext, Storage};

/// URL capture holding the object identifier, unless overridden.
const DEFAULT_URL_FIELD: &str = "id";

/// One incoming request, already stripped of its transport.
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub method: Method,
    /// Absolute request URL, used for pagination and `Location`
    pub url: Url,
    /// Captures of the matched URL pattern
    pub view_args: BTreeMap<String, String>,
    pub body: Bytes,
    pub principal: Option<Principal>,
}

impl ResourceRequest {
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            view_args: BTreeMap::new(),
            body: Bytes::new(),
            principal: None,
        }
    }

    #[must_use]
    pub fn with_view_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.view_args.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_view_args(mut self, view_args: BTreeMap<String, String>) -> Self {
        self.view_args.extend(view_args);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_principal(mut self, principal: Option<Principal>) -> Self {
        self.principal = principal;
        self
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    /// `ResourceError::MalformedBody` if the body is not valid JSON.
    pub fn json_body(&self) -> Result<Value, ResourceError> {
        serde_json::from_slice(&self.body).map_err(ResourceError::MalformedBody)
    }

    fn view_arg(&self, name: &str) -> Result<&str, ResourceError> {
        self.view_args
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| anyhow::anyhow!("URL pattern does not capture \"{name}\"").into())
    }
}

/// A schema type bound to its storage.
#[derive(Clone)]
pub struct Resource {
    schema_type: String,
    registry: Arc<SchemaRegistry>,
    storage: Arc<dyn Storage>,
    limits: QueryLimits,
    delete_response: DeleteResponse,
    url_field: String,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("schema_type", &self.schema_type)
            .field("limits", &self.limits)
            .field("delete_response", &self.delete_response)
            .field("url_field", &self.url_field)
            .finish_non_exhaustive()
    }
}

impl Resource {
    /// Bind `schema_type` to `storage` with default engine settings.
    ///
    /// # Errors
    /// `SchemaError::UnknownType` if the type is not registered.
    pub fn new(
        registry: Arc<SchemaRegistry>,
        schema_type: impl Into<String>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, SchemaError> {
        let schema_type = schema_type.into();
        registry.require(&schema_type)?;
        Ok(Self {
            schema_type,
            registry,
            storage,
            limits: QueryLimits::default(),
            delete_response: DeleteResponse::default(),
            url_field: DEFAULT_URL_FIELD.to_owned(),
        })
    }

    #[must_use]
    pub fn with_config(mut self, config: &JsonApiConfig) -> Self {
        self.limits = config.limits();
        self.delete_response = config.delete_response;
        self
    }

    /// Name of the URL capture holding the object identifier
    #[must_use]
    pub fn with_url_field(mut self, field: impl Into<String>) -> Self {
        self.url_field = field.into();
        self
    }

    #[must_use]
    pub fn schema_type(&self) -> &str {
        &self.schema_type
    }

    #[must_use]
    pub fn url_field(&self) -> &str {
        &self.url_field
    }

    fn schema(&self) -> Result<&SchemaDefinition, ResourceError> {
        Ok(self.registry.require(&self.schema_type)?)
    }

    fn query_options(&self, req: &ResourceRequest) -> Result<QueryOptions, ResourceError> {
        Ok(QueryOptions::parse_query_str(
            req.url.query().unwrap_or_default(),
            &self.schema_type,
            self.registry.as_ref(),
            &self.limits,
        )?)
    }

    fn derive(
        &self,
        options: &QueryOptions,
        mode: SchemaMode,
    ) -> Result<DerivedSchema<'_>, ResourceError> {
        DerivedSchema::derive(&self.registry, &self.schema_type, options, mode)
    }

    fn context(&self, req: &ResourceRequest) -> RequestContext {
        RequestContext {
            resource_type: self.schema_type.clone(),
            view_args: req.view_args.clone(),
            principal: req.principal.clone(),
        }
    }
}
