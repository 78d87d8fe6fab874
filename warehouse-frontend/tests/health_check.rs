mod common;

use axum::http::StatusCode;
use common::TestApp;

#[tokio::test]
async fn health_check_works() {
    let mut app = TestApp::spawn().await;

    let response = app.get("/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "OK");
}

#[tokio::test]
async fn responses_carry_security_headers_and_request_id() {
    let mut app = TestApp::spawn().await;

    let response = app.get("/health").await;

    assert_eq!(response.header("x-frame-options"), Some("DENY"));
    assert!(response.header("x-request-id").is_some());
    let csp = response.header("content-security-policy").unwrap_or_default();
    assert!(csp.contains("https://unpkg.com"));
}

#[tokio::test]
async fn unknown_route_returns_not_found() {
    let mut app = TestApp::spawn().await;

    let response = app.get("/no-such-page").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
