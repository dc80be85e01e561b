//! OAuth stub and service endpoint integration tests

use axum::body::Body;
use axum::http::{header, Request};
use serde_json::{json, Value};
use tower::ServiceExt;

use hearth_gateway::StateStore;

mod common;
use common::build_router;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

#[tokio::test]
async fn health_reports_version() {
    let app = build_router(StateStore::new());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("ok"));
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn login_page_serves_link_form() {
    let app = build_router(StateStore::new());
    let response = app
        .oneshot(Request::builder().uri("/login").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("<form"));
    assert!(html.contains("redirect_uri"));
}

#[tokio::test]
async fn fakeauth_redirects_with_fixed_code() {
    let app = build_router(StateStore::new());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/fakeauth?redirect_uri=https%3A%2F%2Fexample.com%2Fcallback&state=abc123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert_eq!(
        location,
        "https://example.com/callback?code=xxxxxx&state=abc123"
    );
}

#[tokio::test]
async fn login_submit_redirects_like_fakeauth() {
    let app = build_router(StateStore::new());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(
                    "redirect_uri=https%3A%2F%2Fexample.com%2Fcb&state=s1",
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert_eq!(location, "https://example.com/cb?code=xxxxxx&state=s1");
}

#[tokio::test]
async fn faketoken_authorization_code_grant() {
    let app = build_router(StateStore::new());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/faketoken?grant_type=authorization_code")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = body_json(response).await;
    assert_eq!(body["token_type"], json!("bearer"));
    assert_eq!(body["access_token"], json!("123access"));
    assert_eq!(body["refresh_token"], json!("123refresh"));
    assert_eq!(body["expires_in"], json!(86400));
}

#[tokio::test]
async fn faketoken_refresh_grant_omits_refresh_token() {
    let app = build_router(StateStore::new());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/faketoken")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("grant_type=refresh_token"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = body_json(response).await;
    assert_eq!(body["access_token"], json!("123access"));
    assert!(body.get("refresh_token").is_none());
}

#[tokio::test]
async fn faketoken_rejects_unknown_grant() {
    let app = build_router(StateStore::new());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/faketoken?grant_type=password")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn requestsync_without_credential_is_500() {
    let app = build_router(StateStore::new());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/requestsync")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("Error requesting sync"));
}
