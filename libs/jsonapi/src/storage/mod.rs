//! Storage collaborator contract.

mod in_memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use jsonapi_query::QueryOptions;

use crate::auth::Principal;
use crate::document::{Record, ResourceIdentifier};
use crate::error::ResourceError;
use crate::schema::Cardinality;

pub use in_memory::InMemoryStorage;

pub type StorageResult<T> = Result<T, ResourceError>;

/// Per-request context handed to every storage call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Type of the resource the endpoint serves
    pub resource_type: String,
    /// Captures of the matched URL pattern
    pub view_args: BTreeMap<String, String>,
    /// Caller resolved by the authenticator, if any
    pub principal: Option<Principal>,
}

impl RequestContext {
    #[must_use]
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            ..Self::default()
        }
    }
}

/// Everything storage needs to resolve one relationship of one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipQuery {
    pub owner_id: String,
    pub relationship: String,
    pub related_type: String,
    pub related_id_field: String,
    pub cardinality: Cardinality,
}

/// Persistence backend of a resource.
///
/// Implementations report failures with the taxonomy errors
/// (`ObjectNotFound`, `RelatedObjectNotFound`, `ObjectAlreadyPresent`,
/// `Unable`); anything else surfaces as a bare 500. Operations a backend does
/// not support keep the default body, which fails with `Unable`.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist a new object and return its identifier.
    async fn create_object(&self, data: Record, ctx: &RequestContext) -> StorageResult<String> {
        let _ = data;
        Err(unsupported("create_object", ctx))
    }

    async fn retrieve_object(&self, id: &str, ctx: &RequestContext) -> StorageResult<Record> {
        let _ = id;
        Err(unsupported("retrieve_object", ctx))
    }

    /// Apply the given members to an existing object and return it updated.
    async fn update_object(
        &self,
        id: &str,
        data: Record,
        ctx: &RequestContext,
    ) -> StorageResult<Record> {
        let _ = (id, data);
        Err(unsupported("update_object", ctx))
    }

    async fn delete_object(&self, id: &str, ctx: &RequestContext) -> StorageResult<()> {
        let _ = id;
        Err(unsupported("delete_object", ctx))
    }

    /// One page of the filtered, sorted collection plus the unpaginated total.
    async fn retrieve_collection(
        &self,
        options: &QueryOptions,
        ctx: &RequestContext,
    ) -> StorageResult<(Vec<Record>, u64)> {
        let _ = options;
        Err(unsupported("retrieve_collection", ctx))
    }

    /// The owner and its related records.
    async fn get_relationship(
        &self,
        query: &RelationshipQuery,
        ctx: &RequestContext,
    ) -> StorageResult<(Record, Vec<Record>)> {
        let _ = query;
        Err(unsupported("get_relationship", ctx))
    }

    /// Add the given identifiers. Returns the owner and whether anything changed.
    async fn create_relationship(
        &self,
        query: &RelationshipQuery,
        linkage: &[ResourceIdentifier],
        ctx: &RequestContext,
    ) -> StorageResult<(Record, bool)> {
        let _ = (query, linkage);
        Err(unsupported("create_relationship", ctx))
    }

    /// Replace the relationship with the given identifiers.
    async fn update_relationship(
        &self,
        query: &RelationshipQuery,
        linkage: &[ResourceIdentifier],
        ctx: &RequestContext,
    ) -> StorageResult<(Record, bool)> {
        let _ = (query, linkage);
        Err(unsupported("update_relationship", ctx))
    }

    /// Remove the given identifiers.
    async fn delete_relationship(
        &self,
        query: &RelationshipQuery,
        linkage: &[ResourceIdentifier],
        ctx: &RequestContext,
    ) -> StorageResult<(Record, bool)> {
        let _ = (query, linkage);
        Err(unsupported("delete_relationship", ctx))
    }
}

fn unsupported(operation: &str, ctx: &RequestContext) -> ResourceError {
    ResourceError::unable(format!(
        "{operation} is not supported for \"{}\"",
        ctx.resource_type
    ))
}
