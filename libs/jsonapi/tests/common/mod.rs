#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Shared fixtures: a `student`/`team` registry mounted on an axum router.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use jsonapi::{
    AttributeDef, InMemoryStorage, JsonApiConfig, JsonApiRouter, RelationshipDef, Resource,
    SchemaDefinition, SchemaRegistry,
};
use serde_json::Value;
use tower::ServiceExt;

pub const MEDIA_TYPE: &str = "application/vnd.api+json";

pub fn registry() -> Arc<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    registry
        .register(
            SchemaDefinition::new("student")
                .attribute(AttributeDef::string("name").required().with_length(Some(1), None))
                .attribute(AttributeDef::integer("age").with_range(Some(0.0), Some(150.0)))
                .relationship(
                    RelationshipDef::to_one("team", "team")
                        .with_self_url("/api/students/{id}/relationships/team")
                        .with_related_url("/api/students/{id}/team"),
                )
                .with_self_url("/api/students/{id}/"),
        )
        .unwrap();
    registry
        .register(
            SchemaDefinition::new("team")
                .attribute(AttributeDef::string("title").required())
                .relationship(
                    RelationshipDef::to_many("users", "student")
                        .with_self_url("/api/teams/{id}/relationships/users")
                        .with_related_url("/api/teams/{id}/users"),
                )
                .with_self_url("/api/teams/{id}/"),
        )
        .unwrap();
    registry.validate().unwrap();
    Arc::new(registry)
}

pub struct TestApp {
    pub router: Router,
    pub storage: Arc<InMemoryStorage>,
}

pub fn app() -> TestApp {
    app_with(JsonApiConfig::default())
}

pub fn app_with(config: JsonApiConfig) -> TestApp {
    let registry = registry();
    let storage = Arc::new(InMemoryStorage::new(registry.clone()));
    let students = Resource::new(registry.clone(), "student", storage.clone()).unwrap();
    let teams = Resource::new(registry, "team", storage.clone()).unwrap();

    let router = JsonApiRouter::new(config)
        .list("/students", students.clone())
        .unwrap()
        .detail("/students/{id}", students.clone())
        .unwrap()
        .relationship("/students/{id}/relationships/{relation}", students)
        .unwrap()
        .list("/teams", teams.clone())
        .unwrap()
        .detail("/teams/{id}", teams.clone())
        .unwrap()
        .relationship("/teams/{id}/relationships/users", teams)
        .unwrap()
        .into_router();

    TestApp { router, storage }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub location: Option<String>,
    pub raw: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.raw).unwrap()
    }
}

impl TestApp {
    pub async fn send(&self, method: Method, uri: &str, body: Option<&str>) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, "localhost")
            .header(header::CONTENT_TYPE, MEDIA_TYPE)
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_owned())))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let header_value = |name: header::HeaderName| {
            response
                .headers()
                .get(name)
                .map(|value| value.to_str().unwrap().to_owned())
        };
        let status = response.status();
        let content_type = header_value(header::CONTENT_TYPE);
        let location = header_value(header::LOCATION);
        let raw = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();

        TestResponse {
            status,
            content_type,
            location,
            raw,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: &Value) -> TestResponse {
        self.send(Method::POST, uri, Some(&body.to_string())).await
    }

    pub async fn patch(&self, uri: &str, body: &Value) -> TestResponse {
        self.send(Method::PATCH, uri, Some(&body.to_string())).await
    }

    pub async fn delete(&self, uri: &str, body: Option<&Value>) -> TestResponse {
        let body = body.map(Value::to_string);
        self.send(Method::DELETE, uri, body.as_deref()).await
    }

    /// Create a student through the API and return its id.
    pub async fn create_student(&self, name: &str, age: i64) -> String {
        let resp = self
            .post(
                "/api/students",
                &serde_json::json!({
                    "data": {"type": "student", "attributes": {"name": name, "age": age}}
                }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED);
        let location = resp.location.unwrap();
        location
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap()
            .to_owned()
    }
}
