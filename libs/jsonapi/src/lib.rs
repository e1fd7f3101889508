#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! JSON:API resource engine.
//!
//! Describe a resource once with a [`SchemaDefinition`], bind it to a
//! [`Storage`] implementation through a [`Resource`], and mount it with
//! [`JsonApiRouter`]. The engine handles sparse fieldsets, inclusion of related
//! resources, pagination links, payload validation and the JSON:API status
//! codes; storage only ever sees validated records and canonical query options.

pub mod auth;
pub mod config;
pub mod derive;
pub mod document;
pub mod error;
pub mod load;
pub mod resource;
pub mod response;
pub mod router;
pub mod schema;
pub mod storage;

pub use auth::{Authenticator, NullAuthenticator, Principal};
pub use config::{DeleteResponse, JsonApiConfig};
pub use derive::{DerivedSchema, IncludeTree, SchemaMode, Serialized};
pub use document::{Document, Linkage, Record, ResourceIdentifier};
pub use error::ResourceError;
pub use load::LoadedResource;
pub use resource::{Resource, ResourceRequest};
pub use response::JsonApiResponse;
pub use router::{JsonApiRouter, RouteError};
pub use schema::{
    AttributeDef, AttributeKind, Cardinality, Constraints, RelationshipDef, SchemaDefinition,
    SchemaError, SchemaRegistry,
};
pub use storage::{InMemoryStorage, RelationshipQuery, RequestContext, Storage, StorageResult};

pub use jsonapi_errors::{ErrorKind, ErrorObject, JsonApiError};
pub use jsonapi_query::{FilterClause, FilterOp, Pagination, QueryOptions, SortDir, SortKey};
