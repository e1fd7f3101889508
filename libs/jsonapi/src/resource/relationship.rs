use http::Method;
use jsonapi_errors::{ErrorKind, JsonApiError};
use serde_json::Value;

use super::{Resource, ResourceRequest};
use crate::derive::SchemaMode;
use crate::document::Record;
use crate::error::ResourceError;
use crate::load::parse_linkage;
use crate::response::JsonApiResponse;
use crate::schema::RelationshipDef;
use crate::storage::RelationshipQuery;

/// URL capture naming the relationship.
const RELATION_ARG: &str = "relation";

impl Resource {
    /// Relationship endpoint: GET reads the linkage, POST adds to it, PATCH
    /// replaces it and DELETE removes from it.
    ///
    /// # Errors
    /// - `RelationNotFound` if the schema declares no such relationship
    /// - `BadRequest`/`InvalidType` for an unusable `data` member
    /// - any storage error; `MethodNotAllowed` for other verbs
    pub async fn handle_relationship(
        &self,
        req: &ResourceRequest,
    ) -> Result<JsonApiResponse, ResourceError> {
        match req.method {
            Method::GET => self.relationship_get(req).await,
            Method::POST | Method::PATCH | Method::DELETE => self.relationship_mutate(req).await,
            ref other => Err(ResourceError::MethodNotAllowed(other.clone())),
        }
    }

    /// Relationship named by the `relation` capture, else by the last path segment.
    fn relationship_def(&self, req: &ResourceRequest) -> Result<&RelationshipDef, ResourceError> {
        let name = req
            .view_args
            .get(RELATION_ARG)
            .map(String::as_str)
            .or_else(|| {
                req.url
                    .path_segments()
                    .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            })
            .unwrap_or_default();

        self.schema()?.relationship_def(name).ok_or_else(|| {
            JsonApiError::from_message(
                ErrorKind::RelationNotFound,
                format!("\"{}\" has no relationship \"{name}\"", self.schema_type),
            )
            .into()
        })
    }

    fn relationship_query(&self, owner_id: &str, relationship: &RelationshipDef) -> RelationshipQuery {
        RelationshipQuery {
            owner_id: owner_id.to_owned(),
            relationship: relationship.name.clone(),
            related_type: relationship.related_type.clone(),
            related_id_field: relationship.related_id_field.clone(),
            cardinality: relationship.cardinality,
        }
    }

    async fn relationship_get(&self, req: &ResourceRequest) -> Result<JsonApiResponse, ResourceError> {
        let owner_id = req.view_arg(&self.url_field)?;
        let relationship = self.relationship_def(req)?;
        let options = self.query_options(req)?;
        let derived = self.derive(&options, SchemaMode::single())?;

        let query = self.relationship_query(owner_id, relationship);
        let (_owner, related) = self
            .storage
            .get_relationship(&query, &self.context(req))
            .await?;

        let related = if relationship.is_to_many() {
            Value::Array(related.into_iter().map(Value::Object).collect())
        } else {
            related.into_iter().next().map_or(Value::Null, Value::Object)
        };
        let document =
            derived.relationship_document(relationship, owner_id, Some(&related), req.url.path());
        Ok(JsonApiResponse::ok(document))
    }

    async fn relationship_mutate(&self, req: &ResourceRequest) -> Result<JsonApiResponse, ResourceError> {
        let owner_id = req.view_arg(&self.url_field)?;
        let relationship = self.relationship_def(req)?;
        let options = self.query_options(req)?;
        let derived = self.derive(&options, SchemaMode::single())?;

        let body = req.json_body()?;
        let Some(data) = body.get("data") else {
            return Err(ResourceError::bad_request(
                "/data",
                "You must provide data with a \"data\" route.",
            ));
        };
        let linkage = parse_linkage(data, relationship, "/data", req.method == Method::PATCH)?;

        let query = self.relationship_query(owner_id, relationship);
        let ctx = self.context(req);
        let identifiers = linkage.identifiers();
        let (owner, changed): (Record, bool) = match req.method {
            Method::POST => self.storage.create_relationship(&query, identifiers, &ctx).await?,
            Method::PATCH => self.storage.update_relationship(&query, identifiers, &ctx).await?,
            _ => self.storage.delete_relationship(&query, identifiers, &ctx).await?,
        };
        tracing::info!(
            resource_type = %self.schema_type,
            id = %owner_id,
            relationship = %relationship.name,
            method = %req.method,
            changed,
            "relationship mutated"
        );

        if !changed {
            return Ok(JsonApiResponse::no_content());
        }
        let document = derived.relationship_document(
            relationship,
            owner_id,
            owner.get(&relationship.name),
            req.url.path(),
        );
        Ok(JsonApiResponse::ok(document))
    }
}
