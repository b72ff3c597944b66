//! Integration tests for the addressbook backend.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (in-memory store)
//! cargo test -p addressbook-integration-tests
//!
//! # PostgreSQL and live-server tests
//! DATABASE_URL=postgres://postgres@localhost/addressbook_test \
//!     cargo test -p addressbook-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `relationships` - transactional inserts and junction contracts
//! - `permissions` - resolver, cascades, the gate
//! - `seed` - idempotent bootstrap
//! - `http_api` - the router driven in-process with `tower::ServiceExt::oneshot`
//! - `postgres` - the same properties against `PgStore` (ignored by default)
//! - `live_server` - a running server over `reqwest` (ignored by default)

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;

use addressbook_core::{Email, PermissionId, PermissionName, RoleId, UserId};
use addressbook_server::db::{
    MemoryStore, PgStore, PoolSettings, RepositoryError, Store, connect_with_retry,
};
use addressbook_server::models::{ContactFields, FirmFields, NewPermission, NewRole, NewUser};
use addressbook_server::services::{BootstrapAdmin, RelationshipManager};
use addressbook_server::services::auth::hash_password;
use addressbook_server::{AppState, build_app, cors_layer};

/// Password used for every user created by these helpers.
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// An in-process application over a fresh in-memory store.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub router: Router,
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let store = MemoryStore::new_shared();
        let state = AppState::new(store.clone(), chrono::Duration::minutes(30));
        let router = build_app(state, cors_layer("http://localhost:8080").unwrap());
        Self { store, router }
    }

    /// Send a request and return the status and the JSON body (`Null` when
    /// the body is empty or not JSON).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// Log in and return the bearer token.
    pub async fn login(&self, identifier: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(serde_json::json!({
                    "identifier": identifier,
                    "password": TEST_PASSWORD,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_owned()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Bootstrap admin with a known password.
#[must_use]
pub fn bootstrap_admin() -> BootstrapAdmin {
    BootstrapAdmin {
        username: "admin".to_owned(),
        email: Email::normalized("admin@system.local").unwrap(),
        password: Some(TEST_PASSWORD.to_owned().into()),
    }
}

/// Insert a user whose password is [`TEST_PASSWORD`].
pub async fn create_user(store: &dyn Store, username: &str) -> UserId {
    store
        .insert_user(&NewUser {
            username: username.to_owned(),
            email: Email::normalized(&format!("{username}@example.com")).unwrap(),
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            created_by: None,
        })
        .await
        .unwrap()
}

pub async fn create_role(store: &dyn Store, name: &str) -> RoleId {
    store
        .insert_role(&NewRole {
            name: name.to_owned(),
            description: format!("{name} role"),
        })
        .await
        .unwrap()
}

pub async fn create_permission(store: &dyn Store, name: &str) -> PermissionId {
    store
        .insert_permission(&NewPermission {
            name: PermissionName::parse(name).unwrap(),
            description: String::new(),
        })
        .await
        .unwrap()
}

/// A role holding exactly `permissions`, created on the fly.
pub async fn role_with(store: &dyn Store, role: &str, permissions: &[&str]) -> RoleId {
    let role = create_role(store, role).await;
    for name in permissions {
        let permission = match store.permission_by_name(name).await {
            Ok(existing) => existing.id,
            Err(_) => create_permission(store, name).await,
        };
        store.insert_role_permission(role, permission).await.unwrap();
    }
    role
}

/// A firm with every required field filled in.
#[must_use]
pub fn firm(name: &str) -> FirmFields {
    FirmFields {
        salutation: "Firma".to_owned(),
        name_1: name.to_owned(),
        postal_code: "10115".to_owned(),
        city: "Berlin".to_owned(),
        phone: "030 1234567".to_owned(),
        email: "info@example.com".to_owned(),
        ..FirmFields::default()
    }
}

/// A contact with the required fields filled in; emails must be unique.
#[must_use]
pub fn contact(first_name: &str, email: &str) -> ContactFields {
    ContactFields {
        first_name: first_name.to_owned(),
        email: email.to_owned(),
        ..ContactFields::default()
    }
}

/// A `PgStore` on `DATABASE_URL` with a fresh schema.
///
/// Each test should use unique names; rows from earlier runs persist.
pub async fn pg_store() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let options: sqlx::postgres::PgConnectOptions = url.parse().unwrap();
    let settings = PoolSettings {
        connect_attempts: 1,
        ..PoolSettings::default()
    };
    let pool = connect_with_retry("test", options, settings).await.unwrap();
    let store = PgStore::new(pool, None);
    store.setup_schema().await.unwrap();
    store
}

/// Run `attempts` `assign(user, role)` calls at once, each on its own task.
pub async fn concurrent_assigns<S: Store>(
    store: Arc<S>,
    user: UserId,
    role: RoleId,
    attempts: usize,
) -> Vec<Result<(), RepositoryError>> {
    let tasks: Vec<_> = (0..attempts)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { RelationshipManager::new(store.as_ref()).assign(user, role).await })
        })
        .collect();

    let mut results = Vec::with_capacity(attempts);
    for task in tasks {
        results.push(task.await.unwrap());
    }
    results
}

/// Run `attempts` `assign_permission(role, permission)` calls at once.
pub async fn concurrent_grants<S: Store>(
    store: Arc<S>,
    role: RoleId,
    permission: PermissionId,
    attempts: usize,
) -> Vec<Result<(), RepositoryError>> {
    let tasks: Vec<_> = (0..attempts)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                RelationshipManager::new(store.as_ref())
                    .assign_permission(role, permission)
                    .await
            })
        })
        .collect();

    let mut results = Vec::with_capacity(attempts);
    for task in tasks {
        results.push(task.await.unwrap());
    }
    results
}

/// Exactly one call won and every other one saw `Conflict`.
pub fn assert_single_winner(results: &[Result<(), RepositoryError>]) {
    let won = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(RepositoryError::Conflict(_))))
        .count();
    assert_eq!(won, 1, "{results:?}");
    assert_eq!(conflicts, results.len() - 1, "{results:?}");
}

/// A short unique suffix for names in shared databases.
#[must_use]
pub fn unique(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    format!("{prefix}_{nanos}")
}
