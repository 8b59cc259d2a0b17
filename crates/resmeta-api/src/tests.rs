//! End-to-end tests through the router.

use crate::handlers::ApiState;
use crate::{MetadataService, router};
use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use resmeta_auth::{Authorizer, LoggedUser, Role, StaticOwnershipGateway, StaticUserResolver};
use resmeta_common::Resource;
use resmeta_store::MemoryStore;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = StaticOwnershipGateway::new()
            .with_owner(Resource::dataset("d1"), "mgr-1")
            .with_owner(Resource::layer("l1"), "mgr-1");
        let resolver = StaticUserResolver::new()
            .with_user("admin", LoggedUser::new("admin-1", Role::Admin).with_apps(["rw"]))
            .with_user("manager", LoggedUser::new("mgr-1", Role::Manager).with_apps(["rw"]))
            .with_user("manager-2", LoggedUser::new("mgr-2", Role::Manager).with_apps(["rw"]))
            .with_user("user", LoggedUser::new("user-1", Role::User).with_apps(["rw"]))
            .with_user("superadmin", LoggedUser::new("root", Role::Superadmin))
            .with_user("service", LoggedUser::microservice());

        let authorizer = Authorizer::new(Arc::new(gateway), store.clone());
        let state = ApiState::new(MetadataService::new(store.clone()), authorizer);
        Self {
            router: router(Arc::new(state), Arc::new(resolver)),
            store,
        }
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .uri(path)
            .method(method)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
        let request = builder.body(body).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()));
        (status, json)
    }

    async fn create(&self, path: &str, body: Value, token: &str) -> Value {
        let (status, json) = self.request("POST", path, Some(body), Some(token)).await;
        assert_eq!(status, StatusCode::OK, "{json}");
        json
    }
}

fn detail(json: &Value) -> &str {
    json["errors"][0]["detail"].as_str().unwrap_or_default()
}

fn names(json: &Value) -> Vec<String> {
    json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["attributes"]["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn test_create_duplicate_delete_flow() {
    let app = TestApp::new();
    let path = "/api/v1/dataset/d1/metadata";
    let body = json!({"application": "rw", "language": "en", "name": "Foo"});

    let json = app.create(path, body.clone(), "admin").await;
    let attributes = &json["data"][0]["attributes"];
    assert_eq!(json["data"][0]["type"], "metadata");
    assert_eq!(attributes["status"], "published");
    assert_eq!(attributes["userId"], "admin-1");
    assert_eq!(attributes["resource"], json!({"id": "d1", "type": "dataset"}));

    let (status, json) = app.request("POST", path, Some(body), Some("admin")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["errors"][0]["status"], 400);
    assert_eq!(
        detail(&json),
        "Metadata of resource dataset: d1, application: rw and language: en already exists"
    );

    let (status, json) = app
        .request("DELETE", &format!("{path}?application=rw"), None, Some("admin"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail(&json), "Bad request");

    let (status, json) = app
        .request("DELETE", &format!("{path}?language=en&application=rw"), None, Some("admin"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&json), vec!["Foo"]);

    let (status, json) = app.request("GET", path, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_with_separator_only_language_keeps_records() {
    let app = TestApp::new();
    let path = "/api/v1/dataset/d1/metadata";
    for language in ["en", "es", "fr"] {
        app.create(path, json!({"application": "rw", "language": language}), "admin")
            .await;
    }

    for query in ["language=%2C&application=rw", "language=%20%2C%20&application=rw"] {
        let (status, json) = app
            .request("DELETE", &format!("{path}?{query}"), None, Some("admin"))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{query}");
        assert_eq!(detail(&json), "Bad request");
    }
    assert_eq!(app.store.len(), 3);

    let (status, json) = app.request("GET", &format!("{path}?application=%2C"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"].as_array().unwrap().is_empty());

    let (_, json) = app.request("GET", &format!("{path}?language=%2C"), None, None).await;
    assert!(json["data"].as_array().unwrap().is_empty());

    let (_, json) = app.request("GET", &format!("{path}?application="), None, None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_role_gating_never_mutates() {
    let app = TestApp::new();
    let path = "/api/v1/dataset/d1/metadata";
    let body = json!({"application": "rw", "language": "en"});

    let (status, _) = app.request("POST", path, Some(body.clone()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.request("POST", path, Some(body.clone()), Some("bogus-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = app.request("POST", path, Some(body), Some("user")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(detail(&json), "Forbidden");

    let wrong_app = json!({"application": "gfw", "language": "en"});
    for token in ["admin", "manager"] {
        let (status, _) = app
            .request("POST", path, Some(wrong_app.clone()), Some(token))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    assert!(app.store.is_empty());

    // No app membership needed
    app.create(path, wrong_app, "superadmin").await;
    assert_eq!(app.store.len(), 1);
}

#[tokio::test]
async fn test_authentication_precedes_validation() {
    let app = TestApp::new();
    let path = "/api/v1/dataset/d1/metadata";

    let (status, _) = app.request("POST", path, Some(json!({})), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = app.request("POST", path, Some(json!({"language": 1})), Some("admin")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        detail(&json),
        "- language: language check failed. - application: application can not be empty. - "
    );

    let (status, _) = app.request("POST", path, None, Some("admin")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patch_semantics() {
    let app = TestApp::new();
    let path = "/api/v1/dataset/d1/layer/l1/metadata";
    app.create(
        path,
        json!({"application": "rw", "language": "en", "name": "Loss", "description": "old"}),
        "admin",
    )
    .await;

    let (status, json) = app
        .request(
            "PATCH",
            path,
            Some(json!({"application": "rw", "language": "en", "description": ""})),
            Some("admin"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"][0]["attributes"]["description"], "");
    assert_eq!(json["data"][0]["attributes"]["name"], "Loss");

    let (status, json) = app
        .request(
            "PATCH",
            path,
            Some(json!({"application": "rw", "language": "fr", "name": "Perte"})),
            Some("admin"),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(detail(&json), "Metadata of resource layer: l1 doesn't exist");
    assert_eq!(app.store.len(), 1);
}

#[tokio::test]
async fn test_manager_ownership() {
    let app = TestApp::new();
    let path = "/api/v1/dataset/d1/metadata";
    let body = json!({"application": "rw", "language": "en", "name": "Mine"});

    // Creating skips ownership checks
    app.create(path, body.clone(), "manager").await;

    let (status, _) = app.request("PATCH", path, Some(body.clone()), Some("manager")).await;
    assert_eq!(status, StatusCode::OK);

    // Registry says d1 belongs to mgr-1
    let (status, _) = app.request("PATCH", path, Some(body.clone()), Some("manager-2")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Unknown to the registry
    let (status, _) = app
        .request("PATCH", "/api/v1/dataset/d1/widget/w1/metadata", Some(body), Some("manager"))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request("DELETE", &format!("{path}?language=en&application=rw"), None, Some("manager"))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_manager_blocked_by_record_owner() {
    let app = TestApp::new();
    let path = "/api/v1/dataset/d1/layer/l1/metadata";
    let body = json!({"application": "rw", "language": "en"});
    app.create(path, body.clone(), "admin").await;

    // mgr-1 owns the layer but not the record
    let (status, _) = app.request("PATCH", path, Some(body), Some("manager")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_clone() {
    let app = TestApp::new();
    let path = "/api/v1/dataset/d1/metadata";
    for language in ["en", "es"] {
        app.create(
            path,
            json!({"application": "rw", "language": language, "name": format!("Foo {language}")}),
            "admin",
        )
        .await;
    }

    let clone = "/api/v1/dataset/d1/metadata/clone";
    let (status, _) = app.request("POST", clone, None, Some("admin")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = app
        .request("POST", clone, Some(json!({"newDataset": "D2", "application": "rw"})), Some("admin"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    for item in data {
        assert_eq!(item["attributes"]["dataset"], "d2");
        assert_eq!(item["attributes"]["resource"]["id"], "d2");
        assert_eq!(item["attributes"]["userId"], "admin-1");
    }

    let (status, json) = app.request("GET", "/api/v1/dataset/d2/metadata?language=es", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&json), vec!["Foo es"]);

    let (status, _) = app
        .request(
            "POST",
            "/api/v1/dataset/d9/metadata/clone",
            Some(json!({"newDataset": "d10", "application": "rw"})),
            Some("admin"),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn seed_search(app: &TestApp) {
    app.create(
        "/api/v1/dataset/d1/metadata",
        json!({"application": "rw", "language": "en", "name": "Forest cover", "description": "Tree canopy"}),
        "service",
    )
    .await;
    app.create(
        "/api/v1/dataset/d1/layer/l1/metadata",
        json!({"application": "rw", "language": "en", "name": "Tree loss", "description": "Forest change"}),
        "service",
    )
    .await;
    app.create(
        "/api/v1/dataset/d2/widget/w1/metadata",
        json!({"application": "gfw", "language": "es", "name": "Rivers", "description": "Water"}),
        "service",
    )
    .await;
}

#[tokio::test]
async fn test_list_search_and_relevance() {
    let app = TestApp::new();
    seed_search(&app).await;

    let (status, json) = app.request("GET", "/api/v1/metadata?search=tree&sort=-relevance", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&json), vec!["Tree loss", "Forest cover"]);

    let (_, json) = app.request("GET", "/api/v1/metadata?search=forest&sort=relevance", None, None).await;
    assert_eq!(names(&json), vec!["Forest cover", "Tree loss"]);

    let (status, json) = app.request("GET", "/api/v1/metadata?search=forest%20water", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 3);

    let (status, json) = app.request("GET", "/api/v1/metadata?search=tree&sort=%2Brelevance", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail(&json), "Sort by relevance ascending not supported");

    // Text AND field filters
    let (_, json) = app
        .request("GET", "/api/v1/metadata?search=forest%20water&application=gfw", None, None)
        .await;
    assert_eq!(names(&json), vec!["Rivers"]);
}

#[tokio::test]
async fn test_list_filters() {
    let app = TestApp::new();
    seed_search(&app).await;

    let (_, json) = app.request("GET", "/api/v1/metadata?type=layer", None, None).await;
    assert_eq!(names(&json), vec!["Tree loss"]);

    let (status, json) = app.request("GET", "/api/v1/metadata?type=dashboard", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"].as_array().unwrap().is_empty());

    let (_, json) = app.request("GET", "/api/v1/metadata?sort=-name&limit=2", None, None).await;
    assert_eq!(names(&json), vec!["Tree loss", "Rivers"]);

    let (_, json) = app.request("GET", "/api/v1/metadata?language=en,es&limit=abc", None, None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_find_by_ids() {
    let app = TestApp::new();
    seed_search(&app).await;

    let (status, json) = app
        .request("POST", "/api/v1/dataset/d1/layer/metadata/find-by-ids", Some(json!({"ids": "l1, l9"})), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&json), vec!["Tree loss"]);

    let (_, json) = app
        .request("POST", "/api/v1/dataset/metadata/get-by-ids", Some(json!({"ids": ["d1", "d2"]})), None)
        .await;
    assert_eq!(names(&json), vec!["Forest cover"]);

    // The dataset segment does not scope the lookup
    let (_, json) = app
        .request(
            "POST",
            "/api/v1/dataset/any/widget/metadata/find-by-ids?application=gfw",
            Some(json!({"ids": ["w1"]})),
            None,
        )
        .await;
    assert_eq!(names(&json), vec!["Rivers"]);

    let (status, json) = app
        .request("POST", "/api/v1/dataset/metadata/find-by-ids", Some(json!({})), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail(&json), "Bad request - Missing 'ids' from request body");
}

#[tokio::test]
async fn test_healthcheck() {
    let app = TestApp::new();
    let (status, json) = app.request("GET", "/healthcheck", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["uptime"].is_u64());
}
