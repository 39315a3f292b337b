mod common;

use axum::http::{header, StatusCode};
use common::{json_body, TestApp};

#[tokio::test]
async fn health_check_returns_200() {
    let app = TestApp::spawn();

    let response = app.get("/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers().get(header::X_FRAME_OPTIONS).unwrap(), "DENY");

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "participation-service-test");
    assert_eq!(body["environment"], "dev");
    assert_eq!(body["locationBackend"], "header");
    assert_eq!(body["captchaEnabled"], true);
}

#[tokio::test]
async fn participation_lists_groups() {
    let app = TestApp::spawn();

    let response = app.get("/participation", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let codes: Vec<&str> = body["groups"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["US", "IN", "ID", "NL"]);
    assert_eq!(body["groups"][3]["label"], "Dutch");
    assert_eq!(body["captchaRequired"], true);
    assert_eq!(body["captchaSiteKey"], "test-site-key");
}

#[tokio::test]
async fn metrics_endpoint_responds() {
    let app = TestApp::spawn();

    let response = app.get("/metrics", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CACHE_CONTROL).is_none());
}
