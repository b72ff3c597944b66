//! Bootstrap seeding.

#![allow(clippy::unwrap_used)]

use addressbook_integration_tests::{bootstrap_admin, create_permission, create_user};
use addressbook_server::db::{
    AssignmentStore, MemoryStore, PermissionStore, RoleStore, UserStore,
};
use addressbook_server::services::seed::{self, ADMIN_ROLE};
use addressbook_server::services::{PERMISSION_CATALOG, PermissionResolver};

#[tokio::test]
async fn test_first_run_creates_catalog_role_and_admin() {
    let store = MemoryStore::new();

    let report = seed::run(&store, &bootstrap_admin()).await.unwrap();

    assert_eq!(report.permissions_created, PERMISSION_CATALOG.len());
    assert!(report.role_created);
    assert!(report.admin_created);
    assert_eq!(report.permission_grants_created, PERMISSION_CATALOG.len());
    assert_eq!(report.permission_grants_skipped, 0);
    assert!(report.admin_role_assigned);

    let admin = store.user_by_username("admin").await.unwrap();
    let effective = PermissionResolver::new(&store)
        .permissions_for_user(admin.id)
        .await
        .unwrap();
    assert_eq!(effective.len(), PERMISSION_CATALOG.len());
}

#[tokio::test]
async fn test_seed_is_idempotent() {
    let store = MemoryStore::new();
    let admin = bootstrap_admin();

    seed::run(&store, &admin).await.unwrap();
    let permissions = store.list_permissions().await.unwrap();
    let roles = store.list_roles().await.unwrap();
    let users = store.list_users().await.unwrap();

    let second = seed::run(&store, &admin).await.unwrap();

    assert_eq!(second.permissions_created, 0);
    assert!(!second.role_created);
    assert!(!second.admin_created);
    assert_eq!(second.permission_grants_created, 0);
    assert_eq!(second.permission_grants_skipped, PERMISSION_CATALOG.len());
    assert!(!second.admin_role_assigned);
    assert_eq!(store.list_permissions().await.unwrap(), permissions);
    assert_eq!(store.list_roles().await.unwrap(), roles);
    assert_eq!(store.list_users().await.unwrap(), users);
}

#[tokio::test]
async fn test_seed_keeps_preexisting_rows() {
    let store = MemoryStore::new();
    let existing = create_permission(&store, "view_firms").await;

    let report = seed::run(&store, &bootstrap_admin()).await.unwrap();

    assert_eq!(report.permissions_created, PERMISSION_CATALOG.len() - 1);
    let role = store.role_by_name(ADMIN_ROLE).await.unwrap();
    let granted = store.permissions_for_role(role.id).await.unwrap();
    assert!(granted.iter().any(|p| p.id == existing));
}

#[tokio::test]
async fn test_seed_reuses_admin_username_under_another_email() {
    let store = MemoryStore::new();
    // admin@example.com, not the configured admin@system.local
    let existing = create_user(&store, "admin").await;

    let report = seed::run(&store, &bootstrap_admin()).await.unwrap();

    assert!(!report.admin_created);
    assert!(report.admin_role_assigned);
    assert_eq!(store.list_users().await.unwrap().len(), 1);
    assert!(
        PermissionResolver::new(&store)
            .has_permission(existing, "admin_panel")
            .await
            .unwrap()
    );
}
