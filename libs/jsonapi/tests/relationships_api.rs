#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Relationship endpoints and compound documents.

mod common;

use axum::http::StatusCode;
use common::{TestApp, app};
use serde_json::{Value, json};

async fn team_with_members(app: &TestApp) -> Vec<String> {
    let alice = app.create_student("Alice", 19).await;
    let bob = app.create_student("Bob", 21).await;
    let resp = app
        .post(
            "/api/teams",
            &json!({"data": {
                "type": "team",
                "attributes": {"title": "Owls"},
                "relationships": {"users": {"data": [{"type": "student", "id": alice}]}}
            }}),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    vec![alice, bob]
}

fn ids(data: &Value) -> Vec<&str> {
    data.as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn create_with_relationships_and_include() {
    let app = app();
    team_with_members(&app).await;

    let body = app.get("/api/teams/0?include=users").await.json();
    assert_eq!(
        body["data"]["relationships"]["users"]["data"],
        json!([{"type": "student", "id": "0"}])
    );
    assert_eq!(
        body["data"]["relationships"]["users"]["links"]["related"],
        "/api/teams/0/users"
    );
    assert_eq!(body["included"].as_array().unwrap().len(), 1);
    assert_eq!(body["included"][0]["type"], "student");
    assert_eq!(body["included"][0]["attributes"]["name"], "Alice");
}

#[tokio::test]
async fn nested_include_is_deduplicated() {
    let app = app();
    team_with_members(&app).await;
    let resp = app
        .send(
            axum::http::Method::PATCH,
            "/api/students/0/relationships/team",
            Some(&json!({"data": {"type": "team", "id": "0"}}).to_string()),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let body = app.get("/api/students?include=team.users").await.json();
    let included = body["included"].as_array().unwrap();
    // the team once; Alice is primary data and is not repeated
    assert_eq!(included.len(), 1);
    assert_eq!(included[0]["type"], "team");
}

#[tokio::test]
async fn relationship_document() {
    let app = app();
    team_with_members(&app).await;

    let resp = app.get("/api/teams/0/relationships/users").await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(ids(&body["data"]), ["0"]);
    assert_eq!(body["links"]["self"], "/api/teams/0/relationships/users");
    assert_eq!(body["links"]["related"], "/api/teams/0/users");
    assert_eq!(body["jsonapi"]["version"], "1.0");
}

#[tokio::test]
async fn adding_and_removing_members() {
    let app = app();
    let [alice, bob] = <[String; 2]>::try_from(team_with_members(&app).await).unwrap();
    let uri = "/api/teams/0/relationships/users";

    let add = json!({"data": [{"type": "student", "id": bob}]});
    let resp = app.post(uri, &add).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(ids(&resp.json()["data"]), [alice.as_str(), bob.as_str()]);

    let resp = app.post(uri, &add).await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);
    assert!(resp.raw.is_empty());

    let resp = app
        .delete(uri, Some(&json!({"data": [{"type": "student", "id": alice}]})))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(ids(&resp.json()["data"]), [bob.as_str()]);

    let resp = app.patch(uri, &json!({"data": []})).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["data"], json!([]));
}

#[tokio::test]
async fn to_one_relationship_by_capture() {
    let app = app();
    team_with_members(&app).await;
    let uri = "/api/students/1/relationships/team";

    let body = app.get(uri).await.json();
    assert_eq!(body["data"], Value::Null);

    let resp = app.patch(uri, &json!({"data": {"type": "team", "id": "0"}})).await;
    assert_eq!(resp.json()["data"], json!({"type": "team", "id": "0"}));

    let resp = app.patch(uri, &json!({"data": null})).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["data"], Value::Null);

    let resp = app
        .patch(uri, &json!({"data": [{"type": "team", "id": "0"}, {"type": "team", "id": "0"}]}))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["errors"][0]["source"]["pointer"], "/data");
}

#[tokio::test]
async fn adding_an_empty_linkage_keeps_the_to_one_target() {
    let app = app();
    team_with_members(&app).await;
    let uri = "/api/students/0/relationships/team";
    app.patch(uri, &json!({"data": {"type": "team", "id": "0"}})).await;

    let resp = app.post(uri, &json!({"data": []})).await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(uri).await.json()["data"], json!({"type": "team", "id": "0"}));
}

#[tokio::test]
async fn relationship_payload_errors() {
    let app = app();
    team_with_members(&app).await;
    let uri = "/api/teams/0/relationships/users";

    let resp = app.post(uri, &json!({"data": [{"type": "team", "id": "0"}]})).await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.json()["errors"][0]["source"]["pointer"], "/data/type");

    let resp = app.post(uri, &json!({"data": [{"type": "student"}]})).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["errors"][0]["source"]["pointer"], "/data/id");

    let resp = app.post(uri, &json!({"links": {}})).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app.post(uri, &json!({"data": [{"type": "student", "id": "77"}]})).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.json()["errors"][0]["title"], "Related object not found");
}

#[tokio::test]
async fn unknown_relation_and_owner() {
    let app = app();
    team_with_members(&app).await;

    let resp = app.get("/api/students/0/relationships/mentor").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.json()["errors"][0]["title"], "Relation object not found");

    let resp = app.get("/api/teams/9/relationships/users").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.json()["errors"][0]["title"], "Object not found");
}
