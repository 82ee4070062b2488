//! HTTP surface tests.
//!
//! Requests go through the real routers with `tower::ServiceExt::oneshot`.

#![allow(clippy::unwrap_used)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use credential_issuer::handlers::ErrorResponse;
use credential_issuer::mocks::{FixedCodeGenerator, MockClock, RecordingNotifier};
use credential_issuer::prelude::*;
use credential_issuer::router::{admin_router, public_router};
use serde_json::{Value, json};
use tower::ServiceExt;

type Service = CredentialService<InMemoryUserRepository, RecordingNotifier, InMemorySessionStore>;

fn service(clock: &MockClock) -> Arc<Service> {
    let users = Arc::new(InMemoryUserRepository::new());
    users.insert_user("user@example.com", UserId(7)).unwrap();

    Arc::new(
        CredentialService::builder(
            users,
            Arc::new(RecordingNotifier::new()),
            Arc::new(InMemorySessionStore::new()),
        )
        .with_clock(Arc::new(clock.clone()))
        .with_code_generator(Arc::new(FixedCodeGenerator::new("482193")))
        .build()
        .unwrap(),
    )
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_session_flow_over_http() {
    let clock = MockClock::new();
    let app = public_router(service(&clock));

    let (status, body) = send(&app, post("/challenge", &json!({"userKey": "user@example.com"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (status, verified) = send(
        &app,
        post("/challenge/verify", &json!({"userKey": "user@example.com", "code": "482193"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["userId"], 7);
    let verification_token = verified["verificationToken"].as_str().unwrap().to_string();

    let mut request = post(
        "/sessions",
        &json!({
            "userId": 7,
            "sessionSecret": "mySecret123",
            "verificationToken": verification_token,
        }),
    );
    request
        .headers_mut()
        .insert(header::USER_AGENT, "http-test".parse().unwrap());
    let (status, session) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    let access_token = session["accessToken"].as_str().unwrap().to_string();
    let refresh_token = session["refreshToken"].as_str().unwrap().to_string();

    let (status, me) = send(&app, get("/me", Some(&access_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        me,
        json!({"userId": 7, "userKey": "user@example.com", "verified": true})
    );

    let (status, refreshed) = send(
        &app,
        post(
            "/sessions/refresh",
            &json!({"refreshToken": refresh_token, "sessionSecret": "mySecret123"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refreshed["userId"], 7);

    let (status, _) = send(
        &app,
        post("/sessions/terminate", &json!({"refreshToken": refresh_token})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        post(
            "/sessions/refresh",
            &json!({"refreshToken": refresh_token, "sessionSecret": "mySecret123"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn test_error_bodies_use_public_codes() {
    let clock = MockClock::new();
    let app = public_router(service(&clock));

    let (status, body) = send(
        &app,
        post("/challenge/verify", &json!({"userKey": "user@example.com", "code": "000000"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let error: ErrorResponse = serde_json::from_value(body).unwrap();
    assert_eq!(error.code, "INVALID_CHALLENGE");

    let (status, body) = send(&app, post("/challenge", &json!({"userKey": "not a key"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, body) = send(
        &app,
        post(
            "/sessions",
            &json!({"userId": 7, "sessionSecret": "s", "verificationToken": "made-up"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_VERIFICATION");
    assert_eq!(body["message"], "Verification failed");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let clock = MockClock::new();
    let app = public_router(service(&clock));

    let request = Request::builder()
        .method("POST")
        .uri("/challenge")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_me_requires_bearer_token() {
    let clock = MockClock::new();
    let app = public_router(service(&clock));

    let (status, body) = send(&app, get("/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_TOKEN");

    let (status, _) = send(&app, get("/me", Some("garbage"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_jwks_and_admin_rotation() {
    let clock = MockClock::new();
    let service = service(&clock);
    let app = public_router(service.clone());
    let admin = admin_router(service.clone());

    let (status, jwks) = send(&app, get("/.well-known/jwks.json", None)).await;
    assert_eq!(status, StatusCode::OK);
    let keys = jwks["keys"].as_array().unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0]["kty"], "RSA");
    assert_eq!(keys[0]["use"], "sig");
    assert_eq!(keys[0]["alg"], "RS256");
    assert_eq!(keys[0]["e"], "AQAB");
    let first_kid = keys[0]["kid"].as_str().unwrap().to_string();

    let (status, rotated) = send(&admin, post("/admin/keys/rotate", &Value::Null)).await;
    assert_eq!(status, StatusCode::OK);
    let new_kid = rotated["newKid"].as_str().unwrap().to_string();
    assert_ne!(new_kid, first_kid);

    let (_, jwks) = send(&app, get("/.well-known/jwks.json", None)).await;
    assert_eq!(jwks["keys"].as_array().unwrap().len(), 2);

    clock.advance(chrono::Duration::days(8));
    let (status, cleaned) = send(&admin, post("/admin/keys/cleanup", &json!({"maxAgeDays": 7}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleaned, json!({"ok": true, "retired": [first_kid]}));

    let (_, jwks) = send(&app, get("/.well-known/jwks.json", None)).await;
    assert_eq!(jwks["keys"][0]["kid"], new_kid.as_str());
}

#[tokio::test]
async fn test_admin_routes_not_on_public_router() {
    let clock = MockClock::new();
    let app = public_router(service(&clock));

    let (status, _) = send(&app, post("/admin/keys/rotate", &Value::Null)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
