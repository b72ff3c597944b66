//! Effective permissions, cascades and the authorization gate.

#![allow(clippy::unwrap_used)]

use addressbook_core::PermissionName;
use addressbook_integration_tests::{create_user, role_with};
use addressbook_server::db::{AssignmentStore, MemoryStore, RoleStore, UserStore};
use addressbook_server::services::{AuthorizationGate, AuthzError, PermissionResolver};

fn names(list: &[&str]) -> Vec<PermissionName> {
    list.iter().map(|n| PermissionName::parse(n).unwrap()).collect()
}

#[tokio::test]
async fn test_union_across_roles_is_deduplicated() {
    let store = MemoryStore::new();
    let carol = create_user(&store, "carol").await;
    let r1 = role_with(&store, "r1", &["p1", "p2"]).await;
    let r2 = role_with(&store, "r2", &["p2", "p3"]).await;
    store.insert_user_role(carol, r1).await.unwrap();
    store.insert_user_role(carol, r2).await.unwrap();

    let effective = PermissionResolver::new(&store)
        .permissions_for_user(carol)
        .await
        .unwrap();

    assert_eq!(
        effective.into_iter().collect::<Vec<_>>(),
        names(&["p1", "p2", "p3"])
    );
}

#[tokio::test]
async fn test_role_delete_cascades() {
    let store = MemoryStore::new();
    let dave = create_user(&store, "dave").await;
    let role = role_with(&store, "temporary", &["view_firms", "edit_firms"]).await;
    store.insert_user_role(dave, role).await.unwrap();

    store.delete_role(role).await.unwrap();

    assert!(store.roles_for_user(dave).await.unwrap().is_empty());
    assert!(store.permissions_for_role(role).await.unwrap().is_empty());
    assert!(
        PermissionResolver::new(&store)
            .permissions_for_user(dave)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_user_delete_cascades_assignments() {
    let store = MemoryStore::new();
    let erin = create_user(&store, "erin").await;
    let role = role_with(&store, "viewer", &["view_firms"]).await;
    store.insert_user_role(erin, role).await.unwrap();

    store.delete_user(erin).await.unwrap();

    assert!(
        PermissionResolver::new(&store)
            .permissions_for_user(erin)
            .await
            .unwrap()
            .is_empty()
    );
    // The role itself survives.
    assert!(store.get_role(role).await.is_ok());
}

#[tokio::test]
async fn test_alice_viewer_scenario() {
    let store = MemoryStore::new();
    let alice = create_user(&store, "alice").await;
    let viewer = role_with(&store, "viewer", &["view_firms", "view_contacts"]).await;
    store.insert_user_role(alice, viewer).await.unwrap();

    let resolver = PermissionResolver::new(&store);
    assert!(resolver.has_permission(alice, "view_firms").await.unwrap());
    assert!(!resolver.has_permission(alice, "edit_firms").await.unwrap());
    assert!(!resolver.has_permission(alice, "delete_firms").await.unwrap());

    let gate = AuthorizationGate::new(&store);
    assert_eq!(gate.authorize(Some(alice), "view_firms").await, Ok(alice));
    assert_eq!(
        gate.authorize(Some(alice), "delete_firms").await,
        Err(AuthzError::Forbidden("delete_firms".to_owned()))
    );
}

#[tokio::test]
async fn test_gate_without_identity_is_unauthenticated() {
    let store = MemoryStore::new();
    let gate = AuthorizationGate::new(&store);

    assert_eq!(
        gate.authorize(None, "view_firms").await,
        Err(AuthzError::Unauthenticated)
    );
}

#[tokio::test]
async fn test_gate_sees_revocation_immediately() {
    let store = MemoryStore::new();
    let frank = create_user(&store, "frank").await;
    let role = role_with(&store, "viewer", &["view_firms"]).await;
    store.insert_user_role(frank, role).await.unwrap();

    let gate = AuthorizationGate::new(&store);
    assert!(gate.authorize(Some(frank), "view_firms").await.is_ok());

    store.delete_user_role(frank, role).await.unwrap();
    assert!(matches!(
        gate.authorize(Some(frank), "view_firms").await,
        Err(AuthzError::Forbidden(_))
    ));
}
