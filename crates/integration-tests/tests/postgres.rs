//! The store contract against a real `PostgreSQL`.
//!
//! These tests require a database at `DATABASE_URL`. Names are made unique
//! per run so the database does not need to be empty.
//!
//! Run with: cargo test -p addressbook-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use addressbook_core::ContactId;
use std::sync::Arc;

use addressbook_integration_tests::{
    assert_single_winner, bootstrap_admin, concurrent_assigns, concurrent_grants, contact,
    create_permission, create_role, create_user, firm, pg_store, role_with, unique,
};
use addressbook_server::db::{
    AssignmentStore, DirectoryStore, RepositoryError, RoleStore, Store,
};
use addressbook_server::services::{PermissionResolver, RelationshipManager, seed};

#[tokio::test]
#[ignore = "requires running PostgreSQL"]
async fn test_pg_firm_insert_is_atomic() {
    let store = pg_store().await;
    let manager = RelationshipManager::new(&store);
    let name = unique("Atomic GmbH");

    let c1 = manager
        .insert_contact_with_firms(&contact("Eva", &format!("{}@example.com", unique("eva"))), &[])
        .await
        .unwrap();

    let result = manager
        .insert_firm_with_contacts(&firm(&name), &[c1, ContactId::new(i64::MAX)])
        .await;
    assert!(matches!(result, Err(RepositoryError::Transaction(_))));
    assert!(
        !store
            .list_firms()
            .await
            .unwrap()
            .iter()
            .any(|f| f.fields.name_1 == name)
    );

    let firm_id = manager
        .insert_firm_with_contacts(&firm(&name), &[c1])
        .await
        .unwrap();
    let linked = store.contacts_for_firm(firm_id).await.unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].id, c1);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL"]
async fn test_pg_assign_contract_and_cascade() {
    let store = pg_store().await;
    let manager = RelationshipManager::new(&store);
    let resolver = PermissionResolver::new(&store);

    let user = create_user(&store, &unique("pg_user")).await;
    let permission = unique("pg_perm");
    let role = role_with(&store, &unique("pg_role"), &[permission.as_str()]).await;

    manager.assign(user, role).await.unwrap();
    assert!(resolver.has_permission(user, &permission).await.unwrap());
    assert!(matches!(
        manager.assign(user, role).await,
        Err(RepositoryError::Conflict(_))
    ));

    store.delete_role(role).await.unwrap();
    assert!(store.roles_for_user(user).await.unwrap().is_empty());
    assert!(!resolver.has_permission(user, &permission).await.unwrap());
    assert!(matches!(
        manager.unassign(user, role).await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
#[ignore = "requires running PostgreSQL"]
async fn test_pg_seed_twice() {
    let store = pg_store().await;

    seed::run(&store, &bootstrap_admin()).await.unwrap();
    let second = seed::run(&store, &bootstrap_admin()).await.unwrap();

    assert_eq!(second.permissions_created, 0);
    assert!(!second.role_created);
    assert!(!second.admin_created);
    assert_eq!(second.permission_grants_created, 0);
    assert!(!second.admin_role_assigned);
    store.ping().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires running PostgreSQL"]
async fn test_pg_concurrent_assigns_have_one_winner() {
    let store = Arc::new(pg_store().await);
    let user = create_user(store.as_ref(), &unique("pg_racer")).await;
    let role = create_role(store.as_ref(), &unique("pg_race_role")).await;
    let permission = create_permission(store.as_ref(), &unique("pg_race_perm")).await;

    assert_single_winner(&concurrent_assigns(store.clone(), user, role, 8).await);
    assert_single_winner(&concurrent_grants(store.clone(), role, permission, 8).await);

    assert_eq!(store.roles_for_user(user).await.unwrap().len(), 1);
    assert_eq!(store.permissions_for_role(role).await.unwrap().len(), 1);
}
