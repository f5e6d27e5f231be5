use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use crate::db::MemoryStore;
use crate::db::enums::RepositoryProvider;
use crate::server::config::ServerConfig;
use crate::services::checker::RandomChecker;
use crate::services::encryption_service::TokenCipher;
use crate::services::fix_generator::DisabledGenerator;
use crate::services::repository_service::RepositoryProbe;
use crate::web::models::repository_models::ConnectionTestResponse;
use crate::web::{AppState, create_axum_router};

struct RejectingProbe;

#[async_trait]
impl RepositoryProbe for RejectingProbe {
    async fn probe(
        &self,
        _provider: RepositoryProvider,
        _owner: &str,
        _repo: &str,
        _token: &str,
    ) -> ConnectionTestResponse {
        ConnectionTestResponse {
            success: false,
            status: Some(401),
            error: Some("Bad credentials".to_string()),
        }
    }
}

fn app() -> Router {
    let config = ServerConfig::for_tests();
    let cipher = TokenCipher::new(&config.encryption_key).unwrap();
    create_axum_router(Arc::new(AppState {
        store: Arc::new(MemoryStore::new()),
        checker: Arc::new(RandomChecker::default()),
        config_tester: Arc::new(RandomChecker::new(1.0)),
        generator: Arc::new(DisabledGenerator),
        probe: Arc::new(RejectingProbe),
        cipher: Arc::new(cipher),
        config: Arc::new(config),
    }))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": email, "password": "secret1", "name": "Tester" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["token"].as_str().unwrap().to_string()
}

async fn create_monitor(app: &Router, token: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/monitors",
        Some(token),
        Some(json!({ "name": "X", "targetUrl": "https://a.example" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "Pending");
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn execute_appends_a_log() {
    let app = app();
    let token = register(&app, "a@example.com").await;
    let id = create_monitor(&app, &token).await;

    let (status, body) = send(&app, "POST", &format!("/api/monitors/{id}/execute"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let result = body["data"]["status"].as_str().unwrap();
    assert!(result == "Working" || result == "Broken");
    assert!(body["message"].as_str().unwrap().starts_with("Monitor executed: "));

    let (status, body) = send(&app, "GET", &format!("/api/monitors/{id}/logs"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_ai_call_persists_no_fix() {
    let app = app();
    let token = register(&app, "a@example.com").await;
    let id = create_monitor(&app, &token).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/ai/analyze",
        Some(&token),
        Some(json!({ "monitorId": id, "originalCode": "print(1)" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "AI service error");

    let (status, body) = send(&app, "GET", &format!("/api/ai/fixes/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = app();
    register(&app, "a@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "a@example.com", "password": "wrong-one" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "A@Example.com ", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn deleting_someone_elses_monitor_is_not_found() {
    let app = app();
    let owner = register(&app, "owner@example.com").await;
    let intruder = register(&app, "intruder@example.com").await;
    let id = create_monitor(&app, &owner).await;

    let (status, body) = send(&app, "DELETE", &format!("/api/monitors/{id}"), Some(&intruder), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Monitor not found");

    let (status, body) = send(&app, "GET", &format!("/api/monitors/{id}"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "X");

    let (status, _) = send(&app, "DELETE", &format!("/api/monitors/{id}"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = app();

    let (status, body) = send(&app, "GET", "/api/monitors", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Access token required");

    let (status, body) = send(&app, "GET", "/api/monitors", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = app();
    register(&app, "a@example.com").await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": "a@example.com", "password": "secret1", "name": "Again" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "User already exists");
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let app = app();
    let token = register(&app, "a@example.com").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/monitors")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Validation failed");
}

#[tokio::test]
async fn profile_round_trip() {
    let app = app();
    let token = register(&app, "a@example.com").await;

    let (status, body) = send(&app, "PUT", "/api/auth/profile", Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = send(
        &app,
        "PUT",
        "/api/auth/profile",
        Some(&token),
        Some(json!({ "name": "Renamed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/api/auth/profile", Some(&token), None).await;
    assert_eq!(body["data"]["name"], "Renamed");
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn stats_and_status_filters() {
    let app = app();
    let token = register(&app, "a@example.com").await;
    let id = create_monitor(&app, &token).await;
    create_monitor(&app, &token).await;

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/monitors/{id}"),
        Some(&token),
        Some(json!({ "status": "broken" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/api/monitors/stats/overview", Some(&token), None).await;
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["broken"], 1);

    let (_, body) = send(&app, "GET", "/api/monitors/status/broken", Some(&token), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = send(&app, "GET", "/api/monitors?status=Pending", Some(&token), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn monitor_test_endpoint_does_not_persist() {
    let app = app();
    let token = register(&app, "a@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/monitors/test",
        Some(&token),
        Some(json!({ "targetUrl": "https://a.example" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["success"], true);

    let (_, body) = send(&app, "GET", "/api/monitors", Some(&token), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn repository_token_is_never_returned() {
    let app = app();
    let token = register(&app, "a@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/repositories",
        Some(&token),
        Some(json!({
            "name": "Scrapers",
            "provider": "github",
            "owner": "acme",
            "repo": "scrapers",
            "accessToken": "ghp_secret",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["full_name"], "acme/scrapers");
    assert_eq!(body["data"]["has_access_token"], true);
    assert!(!body.to_string().contains("ghp_secret"));
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(&app, "POST", &format!("/api/repositories/{id}/test"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], false);
    assert_eq!(body["data"]["status"], 401);

    let (_, body) = send(&app, "GET", &format!("/api/repositories/{id}"), Some(&token), None).await;
    assert_eq!(body["data"]["sync_status"], "failed");
}

#[tokio::test]
async fn health_endpoints_report_storage() {
    let app = app();
    register(&app, "a@example.com").await;

    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["database"], "up");

    let (status, body) = send(&app, "GET", "/api/health/detailed", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"]["users"], 1);
    assert_eq!(body["environment"], "test");
}
