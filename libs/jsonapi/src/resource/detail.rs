use std::slice;

use http::Method;
use jsonapi_errors::{ErrorKind, JsonApiError};
use serde_json::{Value, json};

use super::{Resource, ResourceRequest};
use crate::config::DeleteResponse;
use crate::derive::{DerivedSchema, SchemaMode};
use crate::document::{Document, Record};
use crate::error::ResourceError;
use crate::response::JsonApiResponse;
use crate::schema::id_value;

const DELETED_MESSAGE: &str = "Object successfully deleted";

impl Resource {
    /// Single object endpoint: GET, PATCH, POST (conflict check) and DELETE.
    ///
    /// # Errors
    /// Any taxonomy error raised while parsing, loading or by storage;
    /// `MethodNotAllowed` for other verbs.
    pub async fn handle_detail(
        &self,
        req: &ResourceRequest,
    ) -> Result<JsonApiResponse, ResourceError> {
        match req.method {
            Method::GET => self.detail_get(req).await,
            Method::PATCH => self.detail_patch(req).await,
            Method::POST => self.detail_post(req).await,
            Method::DELETE => self.detail_delete(req).await,
            ref other => Err(ResourceError::MethodNotAllowed(other.clone())),
        }
    }

    fn object_document(
        &self,
        derived: &DerivedSchema<'_>,
        record: Record,
        id: &str,
        req: &ResourceRequest,
    ) -> Document {
        let self_link = derived
            .base()
            .self_link(id)
            .unwrap_or_else(|| req.url.path().to_owned());
        derived
            .serialize(slice::from_ref(&record))
            .into_document()
            .with_links(json!({ "self": self_link }))
    }

    async fn detail_get(&self, req: &ResourceRequest) -> Result<JsonApiResponse, ResourceError> {
        let id = req.view_arg(&self.url_field)?;
        let options = self.query_options(req)?;
        let derived = self.derive(&options, SchemaMode::single())?;

        let record = self.storage.retrieve_object(id, &self.context(req)).await?;
        Ok(JsonApiResponse::ok(self.object_document(&derived, record, id, req)))
    }

    async fn detail_patch(&self, req: &ResourceRequest) -> Result<JsonApiResponse, ResourceError> {
        let id = req.view_arg(&self.url_field)?;
        let options = self.query_options(req)?;
        let derived = self.derive(&options, SchemaMode::partial())?;

        let body = req.json_body()?;
        let Some(data) = body.get("data").and_then(Value::as_object) else {
            return Err(ResourceError::bad_request("/data", "Object must include `data` key."));
        };

        // The identifier is checked before anything is validated or applied.
        match data.get("id").and_then(id_value) {
            None => {
                return Err(JsonApiError::from_pointer_and_message(
                    ErrorKind::InvalidIdentifier,
                    "/data/id",
                    "Missing `id` in `data` object.",
                )
                .into());
            }
            Some(given) if given != id => {
                return Err(JsonApiError::from_pointer_and_message(
                    ErrorKind::InvalidIdentifier,
                    "/data/id",
                    format!("Value of `id` (\"{given}\") does not match the resource identifier in the URL (\"{id}\")."),
                )
                .into());
            }
            Some(_) => {}
        }

        let loaded = derived.load(&body)?;
        let record = loaded.into_record(derived.base());

        let updated = self
            .storage
            .update_object(id, record, &self.context(req))
            .await?;
        tracing::info!(resource_type = %self.schema_type, %id, "object updated");

        let derived = derived.with_mode(SchemaMode::single());
        Ok(JsonApiResponse::ok(self.object_document(&derived, updated, id, req)))
    }

    async fn detail_post(&self, req: &ResourceRequest) -> Result<JsonApiResponse, ResourceError> {
        let id = req.view_arg(&self.url_field)?;
        self.storage.retrieve_object(id, &self.context(req)).await?;
        Err(JsonApiError::from_message(
            ErrorKind::ObjectAlreadyPresent,
            format!("\"{}\" with id \"{id}\" already exists", self.schema_type),
        )
        .into())
    }

    async fn detail_delete(&self, req: &ResourceRequest) -> Result<JsonApiResponse, ResourceError> {
        let id = req.view_arg(&self.url_field)?;
        let ctx = self.context(req);

        self.storage.retrieve_object(id, &ctx).await?;
        self.storage.delete_object(id, &ctx).await?;
        tracing::info!(resource_type = %self.schema_type, %id, "object deleted");

        Ok(match self.delete_response {
            DeleteResponse::Confirmation => {
                JsonApiResponse::ok(Document::meta(json!({ "message": DELETED_MESSAGE })))
            }
            DeleteResponse::NoContent => JsonApiResponse::no_content(),
        })
    }
}
