//! The HTTP surface, driven in-process over the in-memory store.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use addressbook_integration_tests::{TestApp, bootstrap_admin, create_user, role_with};
use addressbook_server::db::AssignmentStore;
use addressbook_server::services::seed;

/// An app with the seed applied and a logged-in admin.
async fn seeded() -> (TestApp, String) {
    let app = TestApp::new();
    seed::run(app.store.as_ref(), &bootstrap_admin()).await.unwrap();
    let token = app.login("admin").await;
    (app, token)
}

fn firm_body(name: &str) -> serde_json::Value {
    json!({
        "anrede": "Firma",
        "name_1": name,
        "plz": "10115",
        "ort": "Berlin",
        "telefon": "030 123",
        "email": "info@example.com"
    })
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();
    let (status, _) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);

    app.store.set_unavailable(true);
    let (status, _) = app.send(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_missing_token_is_unauthenticated() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/firm/get", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn test_unknown_token_is_unauthenticated() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Method::GET, "/me/permissions", Some("not-a-token"), None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn test_register_login_and_logout() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "username": "gina",
                "email": "Gina@Example.com",
                "password": "correct-horse-battery"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "username": "gina2",
                "email": "gina@example.com",
                "password": "correct-horse-battery"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let token = app.login("gina@example.com").await;
    let (status, body) = app
        .send(Method::GET, "/me/permissions", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["permissions"], json!([]));

    let (status, _) = app
        .send(Method::POST, "/auth/logout", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(Method::GET, "/me/permissions", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password_is_unauthenticated() {
    let (app, _) = seeded().await;
    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"identifier": "admin", "password": "wrong-password"})),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_viewer_can_read_but_not_write() {
    let app = TestApp::new();
    let alice = create_user(app.store.as_ref(), "alice").await;
    let viewer = role_with(app.store.as_ref(), "viewer", &["view_firms"]).await;
    app.store.insert_user_role(alice, viewer).await.unwrap();
    let token = app.login("alice").await;

    let (status, body) = app.send(Method::GET, "/firm/get", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    let (status, body) = app
        .send(Method::POST, "/firm/submit", Some(&token), Some(firm_body("X")))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = app
        .send(Method::DELETE, "/firm/delete?id=1", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_firm_submit_and_lookup_by_contact() {
    let (app, token) = seeded().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/contact/submit",
            Some(&token),
            Some(json!({"vorname": "Eva", "email": "eva@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let contact_id = body["contact_id"].as_i64().unwrap();

    let mut firm = firm_body("Muster GmbH");
    firm["contact_ids"] = json!([contact_id]);
    let (status, body) = app
        .send(Method::POST, "/firm/submit", Some(&token), Some(firm))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["contact_ids"], json!([contact_id]));
    let firm_id = body["firm_id"].as_i64().unwrap();

    let (status, body) = app
        .send(
            Method::GET,
            &format!("/firm/by_contact?contact_id={contact_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["firms"][0]["id"], firm_id);
    assert_eq!(body["firms"][0]["name_1"], "Muster GmbH");
}

#[tokio::test]
async fn test_firm_submit_with_unknown_contact_rolls_back() {
    let (app, token) = seeded().await;

    let mut firm = firm_body("Ghost GmbH");
    firm["contact_ids"] = json!([4242]);
    let (status, body) = app
        .send(Method::POST, "/firm/submit", Some(&token), Some(firm))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "transaction_error");
    assert!(!body["message"].as_str().unwrap().contains("4242"));

    let (_, body) = app.send(Method::GET, "/firm/get", Some(&token), None).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_validation_errors() {
    let (app, token) = seeded().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/firm/submit",
            Some(&token),
            Some(json!({"name_1": "Half GmbH"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].as_str().unwrap().contains("anrede"));

    let (status, body) = app
        .send(
            Method::POST,
            "/contact/submit",
            Some(&token),
            Some(json!({"vorname": "Eva", "email": "e@x.de", "geburtstag": "01.04.1990"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = app
        .send(Method::GET, "/firm/get_by_id?id=abc", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_not_found_and_conflict_kinds() {
    let (app, token) = seeded().await;

    let (status, body) = app
        .send(Method::GET, "/firm/get_by_id?id=77", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "firm not found");

    let (status, body) = app
        .send(
            Method::POST,
            "/roles/create",
            Some(&token),
            Some(json!({"name": "admin"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_role_assignment_over_http() {
    let (app, token) = seeded().await;
    let hank = create_user(app.store.as_ref(), "hank").await;

    let (status, role) = app
        .send(
            Method::POST,
            "/roles/create",
            Some(&token),
            Some(json!({"name": "viewer", "description": "read only"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let role_id = role["id"].as_i64().unwrap();

    let pair = json!({"user_id": hank.as_i64(), "role_id": role_id});
    let (status, _) = app
        .send(Method::POST, "/user_roles/assign", Some(&token), Some(pair.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(Method::POST, "/user_roles/assign", Some(&token), Some(pair))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, body) = app
        .send(
            Method::GET,
            &format!("/user_roles/list?user_id={hank}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "viewer");

    let remove = format!("/user_roles/remove?user_id={hank}&role_id={role_id}");
    let (status, _) = app.send(Method::DELETE, &remove, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.send(Method::DELETE, &remove, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_devices_need_only_authentication() {
    let app = TestApp::new();
    create_user(app.store.as_ref(), "ivan").await;
    let token = app.login("ivan").await;

    let (status, _) = app.send(Method::GET, "/devices/list", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, a) = app
        .send(
            Method::POST,
            "/devices/create",
            Some(&token),
            Some(json!({"Name": "core-switch", "IP": "10.0.0.2"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{a}");
    let (_, b) = app
        .send(
            Method::POST,
            "/devices/create",
            Some(&token),
            Some(json!({"Name": "nas-01"})),
        )
        .await;

    let link = json!({"from_device_id": a["ID"], "to_device_id": b["ID"]});
    let (status, _) = app
        .send(Method::POST, "/device_links/create", Some(&token), Some(link))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let self_link = json!({"from_device_id": a["ID"], "to_device_id": a["ID"]});
    let (status, _) = app
        .send(Method::POST, "/device_links/create", Some(&token), Some(self_link))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/devices/delete?id={}", a["ID"]),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, links) = app
        .send(Method::GET, "/device_links/list", Some(&token), None)
        .await;
    assert_eq!(links, json!([]));
}

#[tokio::test]
async fn test_lost_database_is_connection_error() {
    let (app, token) = seeded().await;
    app.store.set_unavailable(true);

    let (status, body) = app.send(Method::GET, "/firm/get", Some(&token), None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "connection_error");
}
