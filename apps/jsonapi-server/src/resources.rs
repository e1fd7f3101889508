//! Sample `student`/`team` resources served by the demo host.

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use jsonapi::{
    AttributeDef, InMemoryStorage, JsonApiConfig, JsonApiRouter, RelationshipDef, Resource,
    SchemaDefinition, SchemaError, SchemaRegistry, Storage,
};

/// Schemas whose link templates live under `base_path`.
///
/// # Errors
/// Fails if the definitions are inconsistent.
pub fn registry(base_path: &str) -> Result<SchemaRegistry, SchemaError> {
    let base = match base_path.trim_matches('/') {
        "" => String::new(),
        trimmed => format!("/{trimmed}"),
    };
    let mut registry = SchemaRegistry::new();
    registry.register(
        SchemaDefinition::new("student")
            .attribute(AttributeDef::string("name").required().with_length(Some(1), Some(200)))
            .attribute(AttributeDef::integer("age").with_range(Some(0.0), Some(150.0)))
            .attribute(AttributeDef::string("email").nullable())
            .relationship(
                RelationshipDef::to_one("team", "team")
                    .with_self_url(format!("{base}/students/{{id}}/relationships/team"))
                    .with_related_url(format!("{base}/students/{{id}}/team"))
                    .with_linkage(),
            )
            .with_self_url(format!("{base}/students/{{id}}/")),
    )?;
    registry.register(
        SchemaDefinition::new("team")
            .attribute(AttributeDef::string("title").required())
            .relationship(
                RelationshipDef::to_many("users", "student")
                    .with_self_url(format!("{base}/teams/{{id}}/relationships/users"))
                    .with_related_url(format!("{base}/teams/{{id}}/users")),
            )
            .with_self_url(format!("{base}/teams/{{id}}/")),
    )?;
    registry.validate()?;
    Ok(registry)
}

/// Mount both resources on an in-memory store.
///
/// # Errors
/// Fails on inconsistent schemas or conflicting routes.
pub fn router(config: &JsonApiConfig) -> Result<Router> {
    let registry = Arc::new(registry(&config.base_path)?);
    let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new(registry.clone()));

    let students = Resource::new(registry.clone(), "student", storage.clone())?;
    let teams = Resource::new(registry, "team", storage)?;

    let router = JsonApiRouter::new(config.clone())
        .list("/students", students.clone())?
        .detail("/students/{id}", students.clone())?
        .relationship("/students/{id}/relationships/{relation}", students)?
        .list("/teams", teams.clone())?
        .detail("/teams/{id}", teams.clone())?
        .relationship("/teams/{id}/relationships/{relation}", teams)?
        .into_router();
    Ok(router)
}
