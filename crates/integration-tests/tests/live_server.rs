//! Smoke tests against a running server.
//!
//! These tests require:
//! - A running `PostgreSQL` database
//! - The server running (cargo run -p addressbook-server)
//!
//! Run with: cargo test -p addressbook-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode};
use serde_json::Value;

/// Base URL for the API (configurable via environment).
fn base_url() -> String {
    std::env::var("ADDRESSBOOK_BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

#[tokio::test]
#[ignore = "requires a running addressbook server"]
async fn test_live_health_and_readiness() {
    let client = Client::new();
    let base = base_url();

    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    let resp = client.get(format!("{base}/health/ready")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires a running addressbook server"]
async fn test_live_protected_route_without_token() {
    let resp = Client::new()
        .get(format!("{}/firm/get", base_url()))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key("x-request-id"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");
}
