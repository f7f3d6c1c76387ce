//! Tests for the non-flow HTTP surface: index page, health check and docs.

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use fake_sso::{AppResources, api, config::AppConfig, oauth2::OAuth2State};
use std::sync::Arc;

fn create_test_server() -> TestServer {
    let config = AppConfig {
        signing_secret: Some("http-handler-test-secret".into()),
        auth_code_ttl_secs: 120,
        ..AppConfig::default()
    };
    let oauth2_state = OAuth2State::from_config(&config).expect("build oauth2 state");
    let resources = AppResources {
        config: Arc::new(config),
    };
    TestServer::new(api::router(oauth2_state, resources)).expect("create test server")
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server();

    let response = server.get("/healthz").await;

    response.assert_status_ok();
    response.assert_text("ok");
}

#[tokio::test]
async fn test_index_lists_flow_endpoints() {
    let server = create_test_server();

    let response = server
        .get("/")
        .add_header(
            HeaderName::from_static("host"),
            HeaderValue::from_static("sso.example"),
        )
        .await;

    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("http:"));
    assert!(html.contains("sso.example"));
    assert!(html.contains("auth-code"));
    assert!(html.contains("authorize"));
    assert!(html.contains("token"));
    assert!(html.contains("120 seconds"));
}

#[tokio::test]
async fn test_index_honours_forwarded_proto() {
    let server = create_test_server();

    let response = server
        .get("/")
        .add_header(
            HeaderName::from_static("host"),
            HeaderValue::from_static("sso.example"),
        )
        .add_header(
            HeaderName::from_static("x-forwarded-proto"),
            HeaderValue::from_static("https"),
        )
        .await;

    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("https:"));
    assert!(html.contains("sso.example"));
}

#[tokio::test]
async fn test_api_docs_are_served() {
    let server = create_test_server();

    let response = server.get("/api-docs").await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let server = create_test_server();

    let response = server.get("/does-not-exist").await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_wrong_method_is_rejected() {
    let server = create_test_server();

    let response = server.delete("/auth-code/token").await;

    response.assert_status(axum::http::StatusCode::METHOD_NOT_ALLOWED);
}
