//! Storage traits.
//!
//! Every backend implements the full family; services depend on
//! [`Store`] (usually as `&dyn Store`) and never on a concrete backend.
//!
//! Shared contract for all backends:
//! - `insert_*` returns the generated ID.
//! - `get_*`, `update_*`, `delete_*` fail with [`RepositoryError::NotFound`]
//!   when the row does not exist.
//! - `list_*` returns rows newest-first by ID.
//! - Unique-key violations fail with [`RepositoryError::Conflict`].
//! - Deleting a parent cascades to every junction row that references it.
//! - An unreachable database fails with [`RepositoryError::Unavailable`].

// Error contract is shared and documented above.
#![allow(clippy::missing_errors_doc)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use addressbook_core::{
    ContactId, DeviceId, DeviceLinkId, Email, FirmId, PermissionId, PermissionName, RoleId,
    UserId,
};

use super::RepositoryError;
use crate::models::{
    Contact, ContactFields, Device, DeviceFields, DeviceLink, DeviceLinkFields, Firm, FirmFields,
    NewPermission, NewRole, NewUser, Permission, Role, User, UserUpdate,
};

/// Users and their credentials.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user.
    ///
    /// # Errors
    ///
    /// `Conflict` if the username or email is taken.
    async fn insert_user(&self, user: &NewUser) -> Result<UserId, RepositoryError>;

    /// Fetch a user by ID.
    async fn get_user(&self, id: UserId) -> Result<User, RepositoryError>;

    /// Fetch a user by exact username.
    async fn user_by_username(&self, username: &str) -> Result<User, RepositoryError>;

    /// Fetch a user by email.
    async fn user_by_email(&self, email: &Email) -> Result<User, RepositoryError>;

    /// The stored argon2 hash for a user.
    async fn password_hash(&self, id: UserId) -> Result<String, RepositoryError>;

    /// Replace a user's username, email and (optionally) password hash.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user is absent, `Conflict` if the new username or
    /// email belongs to another user.
    async fn update_user(&self, id: UserId, update: &UserUpdate) -> Result<(), RepositoryError>;

    /// Delete a user. Role assignments and tokens cascade; users it created
    /// keep existing with `created_by` cleared.
    async fn delete_user(&self, id: UserId) -> Result<(), RepositoryError>;

    /// All users, newest first.
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;

    /// Stamp `last_login` with the current time.
    async fn touch_last_login(&self, id: UserId) -> Result<(), RepositoryError>;
}

/// Roles.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn insert_role(&self, role: &NewRole) -> Result<RoleId, RepositoryError>;
    async fn get_role(&self, id: RoleId) -> Result<Role, RepositoryError>;
    async fn role_by_name(&self, name: &str) -> Result<Role, RepositoryError>;
    async fn update_role(&self, id: RoleId, role: &NewRole) -> Result<(), RepositoryError>;
    /// Delete a role; its user and permission links cascade.
    async fn delete_role(&self, id: RoleId) -> Result<(), RepositoryError>;
    async fn list_roles(&self) -> Result<Vec<Role>, RepositoryError>;
}

/// Permissions.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn insert_permission(
        &self,
        permission: &NewPermission,
    ) -> Result<PermissionId, RepositoryError>;
    async fn get_permission(&self, id: PermissionId) -> Result<Permission, RepositoryError>;
    async fn permission_by_name(&self, name: &str) -> Result<Permission, RepositoryError>;
    async fn update_permission(
        &self,
        id: PermissionId,
        permission: &NewPermission,
    ) -> Result<(), RepositoryError>;
    /// Delete a permission; its role links cascade.
    async fn delete_permission(&self, id: PermissionId) -> Result<(), RepositoryError>;
    async fn list_permissions(&self) -> Result<Vec<Permission>, RepositoryError>;
}

/// The user↔role and role↔permission junctions.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Insert a user↔role pair.
    ///
    /// # Errors
    ///
    /// `Conflict` if the pair exists, `NotFound` if the user or role does not.
    async fn insert_user_role(&self, user: UserId, role: RoleId) -> Result<(), RepositoryError>;

    /// Delete a user↔role pair; `NotFound` if it was never there.
    async fn delete_user_role(&self, user: UserId, role: RoleId) -> Result<(), RepositoryError>;

    /// Insert a role↔permission pair (same contract as `insert_user_role`).
    async fn insert_role_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<(), RepositoryError>;

    /// Delete a role↔permission pair; `NotFound` if it was never there.
    async fn delete_role_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<(), RepositoryError>;

    /// Roles held by a user, newest role first.
    async fn roles_for_user(&self, user: UserId) -> Result<Vec<Role>, RepositoryError>;

    /// Permissions granted by a role, newest permission first.
    async fn permissions_for_role(&self, role: RoleId)
    -> Result<Vec<Permission>, RepositoryError>;

    /// Distinct permission names reachable from a user through any role.
    ///
    /// Read fresh on every call; an unknown user yields an empty list.
    async fn permission_names_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<PermissionName>, RepositoryError>;
}

/// Firms, contacts and their many-to-many junction.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Insert a firm and one link per contact ID, in order, atomically.
    ///
    /// # Errors
    ///
    /// Failure of the firm row itself is reported as-is. Any failure after
    /// the firm row was written (unknown or repeated contact ID, lost
    /// connection) rolls the whole operation back and is reported as
    /// `Transaction`.
    async fn insert_firm_with_contacts(
        &self,
        firm: &FirmFields,
        contact_ids: &[ContactId],
    ) -> Result<FirmId, RepositoryError>;

    /// Insert a contact and one link per firm ID, atomically
    /// (same contract as `insert_firm_with_contacts`).
    async fn insert_contact_with_firms(
        &self,
        contact: &ContactFields,
        firm_ids: &[FirmId],
    ) -> Result<ContactId, RepositoryError>;

    async fn get_firm(&self, id: FirmId) -> Result<Firm, RepositoryError>;
    async fn update_firm(&self, id: FirmId, firm: &FirmFields) -> Result<(), RepositoryError>;
    async fn delete_firm(&self, id: FirmId) -> Result<(), RepositoryError>;
    async fn list_firms(&self) -> Result<Vec<Firm>, RepositoryError>;

    async fn get_contact(&self, id: ContactId) -> Result<Contact, RepositoryError>;
    async fn update_contact(
        &self,
        id: ContactId,
        contact: &ContactFields,
    ) -> Result<(), RepositoryError>;
    async fn delete_contact(&self, id: ContactId) -> Result<(), RepositoryError>;
    async fn list_contacts(&self) -> Result<Vec<Contact>, RepositoryError>;

    /// Firms linked to a contact, newest first.
    async fn firms_for_contact(&self, contact: ContactId) -> Result<Vec<Firm>, RepositoryError>;

    /// Contacts linked to a firm, newest first.
    async fn contacts_for_firm(&self, firm: FirmId) -> Result<Vec<Contact>, RepositoryError>;
}

/// The device inventory.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn insert_device(&self, device: &DeviceFields) -> Result<DeviceId, RepositoryError>;
    async fn get_device(&self, id: DeviceId) -> Result<Device, RepositoryError>;
    async fn update_device(
        &self,
        id: DeviceId,
        device: &DeviceFields,
    ) -> Result<(), RepositoryError>;
    /// Delete a device; links from or to it cascade.
    async fn delete_device(&self, id: DeviceId) -> Result<(), RepositoryError>;
    async fn list_devices(&self) -> Result<Vec<Device>, RepositoryError>;

    /// Insert a link; `NotFound` if either device is absent.
    async fn insert_device_link(
        &self,
        link: &DeviceLinkFields,
    ) -> Result<DeviceLinkId, RepositoryError>;
    async fn get_device_link(&self, id: DeviceLinkId) -> Result<DeviceLink, RepositoryError>;
    async fn update_device_link(
        &self,
        id: DeviceLinkId,
        link: &DeviceLinkFields,
    ) -> Result<(), RepositoryError>;
    async fn delete_device_link(&self, id: DeviceLinkId) -> Result<(), RepositoryError>;
    async fn list_device_links(&self) -> Result<Vec<DeviceLink>, RepositoryError>;

    /// Links whose `from_device_id` is `device`, newest first.
    async fn links_from_device(&self, device: DeviceId)
    -> Result<Vec<DeviceLink>, RepositoryError>;
}

/// Opaque bearer tokens (stored as SHA-256 hex digests).
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert_token(
        &self,
        token_hash: &str,
        user: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// The owner of an unexpired token; `NotFound` if absent or expired.
    async fn user_for_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<UserId, RepositoryError>;

    /// Delete a token; `NotFound` if absent.
    async fn delete_token(&self, token_hash: &str) -> Result<(), RepositoryError>;

    /// Drop every token that expired at or before `now`; returns how many.
    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

/// Everything the application needs from persistence.
#[async_trait]
pub trait Store:
    UserStore
    + RoleStore
    + PermissionStore
    + AssignmentStore
    + DirectoryStore
    + DeviceStore
    + TokenStore
    + 'static
{
    /// Create all tables if absent. Safe to run on every start.
    async fn setup_schema(&self) -> Result<(), RepositoryError>;

    /// Cheap round trip for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError>;
}
