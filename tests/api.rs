mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{KID, SIGNING_KEY, TestApp, admin_claims, admin_token, json_body, mint_token, request};

async fn send(app: &TestApp, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let response = app
        .router()
        .oneshot(request(method, uri, token, body))
        .await
        .unwrap();
    let status = response.status();
    (status, json_body(response).await)
}

fn session_body() -> Value {
    json!({
        "id": "caller-chosen",
        "title": "Async Rust in production",
        "slug": "async-rust",
        "tags": ["rust", "tokio", "rust"],
        "description": "Lessons learned",
        "room": "Hall B",
        "level": "intermediate",
        "format": "lecture",
        "language": "en",
        "speakerIds": ["sp-1"]
    })
}

fn speaker_body(id: &str) -> Value {
    json!({
        "id": id,
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "company": "Analytical Engines"
    })
}

#[tokio::test]
async fn health_needs_no_token() {
    let app = TestApp::new().await;

    let (status, body) = send(&app, "GET", "/api/v1/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Conferenti Admin Api is Healthy");
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["service"], "conferenti-admin-api");
}

#[tokio::test]
async fn admin_routes_require_a_token() {
    let app = TestApp::new().await;

    for (method, uri) in [
        ("GET", "/api/v1/sessions"),
        ("POST", "/api/v1/sessions"),
        ("GET", "/api/v1/sessions/s-1"),
        ("DELETE", "/api/v1/speakers/sp-1"),
        ("PUT", "/api/v1/speakers/sp-1"),
    ] {
        let (status, body) = send(&app, method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body["error"], "No valid token found");
    }
}

#[tokio::test]
async fn admin_routes_require_the_admin_scope() {
    let app = TestApp::new().await;
    let mut claims = admin_claims();
    claims["scope"] = json!("openid read:sessions");
    let token = mint_token(&claims, Some(KID), &SIGNING_KEY);

    let (status, body) = send(&app, "GET", "/api/v1/sessions", Some(&token), None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Missing required scope: admin:execute");
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let app = TestApp::new().await;
    let mut claims = admin_claims();
    claims["exp"] = json!(common::now() - 60);
    let token = mint_token(&claims, Some(KID), &SIGNING_KEY);

    let (status, body) = send(&app, "GET", "/api/v1/speakers", Some(&token), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);
}

#[tokio::test]
async fn session_lifecycle() {
    let app = TestApp::new().await;
    let token = admin_token();

    let (status, created) = send(&app, "POST", "/api/v1/sessions", Some(&token), Some(session_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["success"], true);
    assert_eq!(created["message"], "Session created successfully");

    let id = created["data"]["id"].as_str().unwrap().to_string();
    assert_ne!(id, "caller-chosen");
    assert_eq!(created["data"]["level"], "intermediate");
    assert_eq!(created["data"]["tags"], json!(["rust", "tokio"]));
    assert_eq!(created["data"]["speakerIds"], json!(["sp-1"]));

    let (status, listed) = send(&app, "GET", "/api/v1/sessions", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    assert!(listed.get("message").is_none());

    let (status, fetched) = send(&app, "GET", &format!("/api/v1/sessions/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["data"], created["data"]);

    let mut replacement = session_body();
    replacement["title"] = json!("Async Rust, revisited");
    replacement["createdAt"] = created["data"]["createdAt"].clone();
    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/v1/sessions/{id}"),
        Some(&token),
        Some(replacement),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["id"], id.as_str());
    assert_eq!(updated["data"]["title"], "Async Rust, revisited");
    assert_eq!(updated["data"]["createdAt"], created["data"]["createdAt"]);

    let (status, deleted) = send(&app, "DELETE", &format!("/api/v1/sessions/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["data"], json!({ "deletedId": id }));

    let (status, missing) = send(&app, "DELETE", &format!("/api/v1/sessions/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["code"], 404);
}

#[tokio::test]
async fn speaker_lifecycle_keeps_the_supplied_id() {
    let app = TestApp::new().await;
    let token = admin_token();

    let (status, created) = send(&app, "POST", "/api/v1/speakers", Some(&token), Some(speaker_body("ada"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["id"], "ada");
    assert_eq!(created["data"]["sessions"], json!([]));

    let (status, fetched) = send(&app, "GET", "/api/v1/speakers/ada", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["data"]["email"], "ada@example.com");

    let (status, conflict) = send(&app, "POST", "/api/v1/speakers", Some(&token), Some(speaker_body("ada"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(conflict["success"], false);
}

#[tokio::test]
async fn speaker_accepts_bare_session_references() {
    let app = TestApp::new().await;
    let token = admin_token();

    let mut body = speaker_body("grace");
    body["sessions"] = json!([{ "id": "s1" }]);

    let (status, created) = send(&app, "POST", "/api/v1/speakers", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["sessions"][0]["id"], "s1");
    assert_eq!(created["data"]["sessions"][0]["title"], "");
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = TestApp::new().await;
    let token = admin_token();

    let (status, _) = send(&app, "GET", "/api/v1/speakers/nobody", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/v1/speakers/nobody",
        Some(&token),
        Some(speaker_body("nobody")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_payloads_are_bad_requests() {
    let app = TestApp::new().await;
    let token = admin_token();

    let mut bad_email = speaker_body("ada");
    bad_email["email"] = json!("not-an-email");
    let (status, body) = send(&app, "POST", "/api/v1/speakers", Some(&token), Some(bad_email)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("email"));

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/sessions",
        Some(&token),
        Some(json!({ "title": "Bad level", "level": "expert" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request payload");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/sessions",
        Some(&token),
        Some(json!({ "title": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
