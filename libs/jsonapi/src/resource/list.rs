use http::Method;
use jsonapi_query::pagination_links;

use super::{Resource, ResourceRequest};
use crate::derive::SchemaMode;
use crate::error::ResourceError;
use crate::response::JsonApiResponse;

impl Resource {
    /// Collection endpoint: GET lists, POST creates.
    ///
    /// # Errors
    /// Any taxonomy error raised while parsing, loading or by storage;
    /// `MethodNotAllowed` for other verbs.
    pub async fn handle_list(&self, req: &ResourceRequest) -> Result<JsonApiResponse, ResourceError> {
        match req.method {
            Method::GET => self.list_get(req).await,
            Method::POST => self.list_post(req).await,
            ref other => Err(ResourceError::MethodNotAllowed(other.clone())),
        }
    }

    async fn list_get(&self, req: &ResourceRequest) -> Result<JsonApiResponse, ResourceError> {
        let options = self.query_options(req)?;
        let derived = self.derive(&options, SchemaMode::many())?;

        let (items, total) = self
            .storage
            .retrieve_collection(&options, &self.context(req))
            .await?;
        tracing::debug!(
            resource_type = %self.schema_type,
            total,
            returned = items.len(),
            "collection retrieved"
        );

        let links = serde_json::to_value(pagination_links(total, options.pagination, &req.url))
            .map_err(anyhow::Error::from)?;
        let document = derived.serialize(&items).into_document().with_links(links);
        Ok(JsonApiResponse::ok(document))
    }

    async fn list_post(&self, req: &ResourceRequest) -> Result<JsonApiResponse, ResourceError> {
        let options = self.query_options(req)?;
        let derived = self.derive(&options, SchemaMode::single())?;

        let body = req.json_body()?;
        let loaded = derived.load(&body)?;
        let record = loaded.into_record(derived.base());

        let id = self.storage.create_object(record, &self.context(req)).await?;
        tracing::info!(resource_type = %self.schema_type, %id, "object created");

        let location = format!("{}/{id}/", req.url.path().trim_end_matches('/'));
        Ok(JsonApiResponse::created(location))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::super::test_support::{request, resources};
    use super::*;
    use http::StatusCode;
    use jsonapi_errors::ErrorKind;
    use serde_json::{Value, json};

    fn body(resp: &JsonApiResponse) -> &Value {
        resp.body.as_ref().unwrap()
    }

    #[tokio::test]
    async fn empty_collection() {
        let (students, _, _) = resources();
        let resp = students
            .handle_list(&request(Method::GET, "/api/students"))
            .await
            .unwrap();

        assert_eq!(resp.status, StatusCode::OK);
        let body = body(&resp);
        assert_eq!(body["data"], json!([]));
        assert_eq!(body["links"]["self"], "http://localhost/api/students");
        assert_eq!(body["jsonapi"]["version"], "1.0");
        assert!(body["links"].get("next").is_none());
    }

    #[tokio::test]
    async fn create_answers_with_location() {
        let (students, _, storage) = resources();
        let req = request(Method::POST, "/api/students").with_body(
            json!({"data": {"type": "student", "attributes": {"name": "Alice", "age": 19}}}).to_string(),
        );

        let resp = students.handle_list(&req).await.unwrap();
        assert_eq!(resp.status, StatusCode::CREATED);
        assert_eq!(resp.location.as_deref(), Some("/api/students/0/"));
        assert!(resp.body.is_none());
        assert_eq!(storage.len("student"), 1);
    }

    #[tokio::test]
    async fn create_rejects_bad_payloads() {
        let (students, _, storage) = resources();

        let wrong_type = request(Method::POST, "/api/students")
            .with_body(json!({"data": {"type": "team", "attributes": {"name": "x"}}}).to_string());
        let err = students.handle_list(&wrong_type).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidType));

        let not_integer = request(Method::POST, "/api/students").with_body(
            json!({"data": {"type": "student", "attributes": {"name": "x", "age": "hello"}}})
                .to_string(),
        );
        let ResourceError::JsonApi(err) = students.handle_list(&not_integer).await.unwrap_err() else {
            panic!("expected a taxonomy error");
        };
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.errors()[0].detail.as_deref(), Some("Not a valid integer."));
        assert_eq!(err.errors()[0].pointer(), Some("/data/attributes/age"));

        let negative = request(Method::POST, "/api/students").with_body(
            json!({"data": {"type": "student", "attributes": {"name": "x", "age": -1}}}).to_string(),
        );
        let err = students.handle_list(&negative).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ValidationError));

        assert!(storage.is_empty("student"));
    }

    #[tokio::test]
    async fn listing_pages_and_filters() {
        let (students, _, storage) = resources();
        for age in 0..25 {
            storage
                .insert("student", json!({"name": format!("s{age}"), "age": age}).as_object().cloned().unwrap())
                .unwrap();
        }

        let req = request(
            Method::GET,
            "/api/students?filter[age]=3",
        );
        let resp = students.handle_list(&req).await.unwrap();
        assert_eq!(body(&resp)["data"].as_array().unwrap().len(), 1);
        assert_eq!(body(&resp)["data"][0]["attributes"]["name"], "s3");

        let req = request(Method::GET, "/api/students?page[number]=2&sort=-age");
        let resp = students.handle_list(&req).await.unwrap();
        let data = body(&resp)["data"].as_array().unwrap();
        assert_eq!(data.len(), 5);
        assert_eq!(data[0]["attributes"]["age"], 4);
        assert!(body(&resp)["links"]["prev"].is_string());
        assert!(body(&resp)["links"].get("next").is_none());
    }

    #[tokio::test]
    async fn invalid_query_parameters() {
        let (students, _, _) = resources();
        let err = students
            .handle_list(&request(Method::GET, "/api/students?sort=shoe_size"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidSort));

        let err = students
            .handle_list(&request(Method::GET, "/api/students?include=mentor"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidInclude));
    }

    #[tokio::test]
    async fn other_verbs_are_not_allowed() {
        let (students, _, _) = resources();
        for method in [Method::PUT, Method::DELETE, Method::PATCH] {
            let err = students
                .handle_list(&request(method.clone(), "/api/students"))
                .await
                .unwrap_err();
            assert!(matches!(err, ResourceError::MethodNotAllowed(m) if m == method));
        }
    }
}
