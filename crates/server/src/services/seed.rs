//! Idempotent bootstrap of the permission catalog and the admin account.
//!
//! Every step is "fetch, create if `NotFound`"; grants go through the
//! [`RelationshipManager`] and a `Conflict` there is counted as skipped.
//! Running the seed any number of times converges on the same state.

use std::collections::BTreeMap;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::instrument;

use addressbook_core::{Email, PermissionId, PermissionName, RoleId, UserId};

use super::RelationshipManager;
use super::auth::hash_password;
use crate::db::{RepositoryError, Store};
use crate::models::{NewPermission, NewRole, NewUser};

/// Every permission the application checks, with its description.
pub const PERMISSION_CATALOG: &[(&str, &str)] = &[
    ("view_users", "View users"),
    ("edit_users", "Edit users"),
    ("create_users", "Create users"),
    ("delete_users", "Delete users"),
    ("view_firms", "View firms"),
    ("edit_firms", "Edit firms"),
    ("create_firms", "Create firms"),
    ("delete_firms", "Delete firms"),
    ("view_contacts", "View contacts"),
    ("edit_contacts", "Edit contacts"),
    ("create_contacts", "Create contacts"),
    ("delete_contacts", "Delete contacts"),
    ("view_roles", "View roles"),
    ("edit_roles", "Edit roles"),
    ("create_roles", "Create roles"),
    ("delete_roles", "Delete roles"),
    ("view_permissions", "View permissions"),
    ("edit_permissions", "Edit permissions"),
    ("create_permissions", "Create permissions"),
    ("delete_permissions", "Delete permissions"),
    ("assign_roles", "Assign roles"),
    ("unassign_roles", "Unassign roles"),
    ("assign_permissions", "Assign permissions"),
    ("unassign_permissions", "Unassign permissions"),
    ("admin_panel", "Access admin panel"),
];

/// Name of the role that receives the whole catalog.
pub const ADMIN_ROLE: &str = "admin";

const ADMIN_ROLE_DESCRIPTION: &str = "Default admin role with full permissions";

/// Bytes of randomness in a generated admin password.
const GENERATED_PASSWORD_BYTES: usize = 18;

/// The admin account the seed guarantees.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: Email,
    /// When `None`, a random password is generated and logged once, only if
    /// the account is actually created.
    pub password: Option<SecretString>,
}

/// What a seed run changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub permissions_created: usize,
    pub role_created: bool,
    pub admin_created: bool,
    /// Role→permission grants added to the admin role.
    pub permission_grants_created: usize,
    pub permission_grants_skipped: usize,
    /// Whether the admin user received the admin role in this run.
    pub admin_role_assigned: bool,
}

/// Errors that abort a seed run.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("seed failed: {0}")]
    Repository(#[from] RepositoryError),

    #[error("could not hash the bootstrap admin password")]
    PasswordHash,
}

/// Converge the store on the catalog, the admin role and the admin user.
///
/// # Errors
///
/// Returns the first store error other than an expected `NotFound` or
/// `Conflict`.
#[instrument(skip_all, fields(admin = %admin.username))]
pub async fn run(store: &dyn Store, admin: &BootstrapAdmin) -> Result<SeedReport, SeedError> {
    tracing::info!("Seeding permissions, admin role and admin user");
    let mut report = SeedReport::default();

    let permissions = ensure_permissions(store, &mut report).await?;
    let role = ensure_admin_role(store, &mut report).await?;
    let user = ensure_admin_user(store, admin, &mut report).await?;

    let relationships = RelationshipManager::new(store);
    for (name, permission) in &permissions {
        match relationships.assign_permission(role, *permission).await {
            Ok(()) => report.permission_grants_created += 1,
            Err(RepositoryError::Conflict(_)) => {
                tracing::debug!(permission = %name, "Permission already granted to admin role");
                report.permission_grants_skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    match relationships.assign(user, role).await {
        Ok(()) => report.admin_role_assigned = true,
        Err(RepositoryError::Conflict(_)) => {
            tracing::debug!("Admin role already assigned to admin user");
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(
        permissions_created = report.permissions_created,
        role_created = report.role_created,
        admin_created = report.admin_created,
        permission_grants_created = report.permission_grants_created,
        permission_grants_skipped = report.permission_grants_skipped,
        admin_role_assigned = report.admin_role_assigned,
        "Seeding complete"
    );
    Ok(report)
}

async fn ensure_permissions(
    store: &dyn Store,
    report: &mut SeedReport,
) -> Result<BTreeMap<&'static str, PermissionId>, SeedError> {
    let mut ids = BTreeMap::new();

    for (name, description) in PERMISSION_CATALOG {
        let id = match store.permission_by_name(name).await {
            Ok(existing) => existing.id,
            Err(RepositoryError::NotFound) => {
                let id = store
                    .insert_permission(&NewPermission {
                        name: PermissionName::from_trusted(*name),
                        description: (*description).to_owned(),
                    })
                    .await?;
                tracing::info!(permission = name, "Created permission");
                report.permissions_created += 1;
                id
            }
            Err(e) => return Err(e.into()),
        };
        ids.insert(*name, id);
    }

    Ok(ids)
}

async fn ensure_admin_role(
    store: &dyn Store,
    report: &mut SeedReport,
) -> Result<RoleId, SeedError> {
    match store.role_by_name(ADMIN_ROLE).await {
        Ok(role) => Ok(role.id),
        Err(RepositoryError::NotFound) => {
            let id = store
                .insert_role(&NewRole {
                    name: ADMIN_ROLE.to_owned(),
                    description: ADMIN_ROLE_DESCRIPTION.to_owned(),
                })
                .await?;
            tracing::info!(role_id = %id, "Created admin role");
            report.role_created = true;
            Ok(id)
        }
        Err(e) => Err(e.into()),
    }
}

async fn ensure_admin_user(
    store: &dyn Store,
    admin: &BootstrapAdmin,
    report: &mut SeedReport,
) -> Result<UserId, SeedError> {
    match store.user_by_email(&admin.email).await {
        Ok(user) => return Ok(user.id),
        Err(RepositoryError::NotFound) => {}
        Err(e) => return Err(e.into()),
    }

    // The username is unique too; an account left behind by an earlier
    // BOOTSTRAP_ADMIN_EMAIL is reused rather than colliding on insert.
    match store.user_by_username(&admin.username).await {
        Ok(user) => {
            tracing::warn!(
                user_id = %user.id,
                configured_email = %admin.email,
                existing_email = %user.email,
                "Bootstrap admin username exists under another email; reusing that account"
            );
            return Ok(user.id);
        }
        Err(RepositoryError::NotFound) => {}
        Err(e) => return Err(e.into()),
    }

    let (password, generated) = match &admin.password {
        Some(password) => (password.clone(), false),
        None => (generate_password(), true),
    };
    let password_hash =
        hash_password(password.expose_secret()).map_err(|_| SeedError::PasswordHash)?;

    let id = store
        .insert_user(&NewUser {
            username: admin.username.clone(),
            email: admin.email.clone(),
            password_hash,
            created_by: None,
        })
        .await?;
    report.admin_created = true;

    if generated {
        tracing::warn!(
            username = %admin.username,
            password = password.expose_secret(),
            "Created bootstrap admin with a generated password; set BOOTSTRAP_ADMIN_PASSWORD or change it now"
        );
    } else {
        tracing::info!(user_id = %id, "Created bootstrap admin");
    }

    Ok(id)
}

fn generate_password() -> SecretString {
    let mut bytes = [0u8; GENERATED_PASSWORD_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    SecretString::from(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names_are_valid_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for (name, _) in PERMISSION_CATALOG {
            assert!(PermissionName::parse(name).is_ok(), "{name}");
            assert!(seen.insert(*name), "{name} listed twice");
        }
        assert_eq!(PERMISSION_CATALOG.len(), 25);
    }

    #[test]
    fn test_generated_passwords_differ() {
        let a = generate_password();
        let b = generate_password();
        assert_eq!(a.expose_secret().len(), 24);
        assert_ne!(a.expose_secret(), b.expose_secret());
    }
}
