//! In-process store.
//!
//! Mirrors the `PostgreSQL` schema rules: unique keys, foreign keys that
//! reject unknown parents with `NotFound`, cascading deletes, and atomic
//! multi-row inserts. Lists are newest-first because tables are ordered maps
//! iterated in reverse.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use addressbook_core::{
    ContactId, DeviceId, DeviceLinkId, Email, FirmId, PermissionId, PermissionName, RoleId,
    UserId,
};

use super::{
    AssignmentStore, DeviceStore, DirectoryStore, PermissionStore, RepositoryError, RoleStore,
    Store, TokenStore, UserStore,
};
use crate::models::{
    Contact, ContactFields, Device, DeviceFields, DeviceLink, DeviceLinkFields, Firm, FirmFields,
    NewPermission, NewRole, NewUser, Permission, Role, User, UserUpdate,
};

#[derive(Debug)]
struct UserRecord {
    user: User,
    password_hash: String,
}

#[derive(Debug)]
struct TokenRecord {
    user: UserId,
    expires_at: DateTime<Utc>,
}

/// Last issued ID per table.
#[derive(Debug, Default)]
struct Sequences {
    user: i64,
    role: i64,
    permission: i64,
    firm: i64,
    contact: i64,
    device: i64,
    device_link: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Default)]
struct Tables {
    seq: Sequences,
    users: BTreeMap<UserId, UserRecord>,
    roles: BTreeMap<RoleId, Role>,
    permissions: BTreeMap<PermissionId, Permission>,
    user_roles: BTreeSet<(UserId, RoleId)>,
    role_permissions: BTreeSet<(RoleId, PermissionId)>,
    firms: BTreeMap<FirmId, Firm>,
    contacts: BTreeMap<ContactId, Contact>,
    firm_contacts: BTreeSet<(FirmId, ContactId)>,
    devices: BTreeMap<DeviceId, Device>,
    device_links: BTreeMap<DeviceLinkId, DeviceLink>,
    tokens: HashMap<String, TokenRecord>,
}

impl Tables {
    fn user_name_or_email_taken(&self, username: &str, email: &Email, except: Option<UserId>) -> bool {
        self.users.values().any(|r| {
            Some(r.user.id) != except && (r.user.username == username || r.user.email == *email)
        })
    }

    fn contact_email_taken(&self, email: &str, except: Option<ContactId>) -> bool {
        self.contacts
            .values()
            .any(|c| Some(c.id) != except && c.fields.email == email)
    }

    fn link_devices_exist(&self, link: &DeviceLinkFields) -> bool {
        self.devices.contains_key(&link.from_device_id)
            && self.devices.contains_key(&link.to_device_id)
    }
}

/// Store that keeps every table in memory behind one lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty store behind an `Arc`, ready for `AppState`.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Simulate a lost database: while set, every call fails with
    /// `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "memory store marked unavailable".to_owned(),
            ));
        }
        Ok(())
    }

    async fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, RepositoryError> {
        self.check_available()?;
        Ok(self.tables.read().await)
    }

    async fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, RepositoryError> {
        self.check_available()?;
        Ok(self.tables.write().await)
    }
}

// =============================================================================
// Users
// =============================================================================

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &NewUser) -> Result<UserId, RepositoryError> {
        let mut t = self.write().await?;
        if t.user_name_or_email_taken(&user.username, &user.email, None) {
            return Err(RepositoryError::Conflict(
                "username or email already exists".to_owned(),
            ));
        }
        if let Some(creator) = user.created_by
            && !t.users.contains_key(&creator)
        {
            return Err(RepositoryError::NotFound);
        }

        let id = UserId::new(next(&mut t.seq.user));
        t.users.insert(
            id,
            UserRecord {
                user: User {
                    id,
                    username: user.username.clone(),
                    email: user.email.clone(),
                    created_at: Utc::now(),
                    created_by: user.created_by,
                    last_login: None,
                },
                password_hash: user.password_hash.clone(),
            },
        );
        Ok(id)
    }

    async fn get_user(&self, id: UserId) -> Result<User, RepositoryError> {
        let t = self.read().await?;
        t.users
            .get(&id)
            .map(|r| r.user.clone())
            .ok_or(RepositoryError::NotFound)
    }

    async fn user_by_username(&self, username: &str) -> Result<User, RepositoryError> {
        let t = self.read().await?;
        t.users
            .values()
            .find(|r| r.user.username == username)
            .map(|r| r.user.clone())
            .ok_or(RepositoryError::NotFound)
    }

    async fn user_by_email(&self, email: &Email) -> Result<User, RepositoryError> {
        let t = self.read().await?;
        t.users
            .values()
            .find(|r| r.user.email == *email)
            .map(|r| r.user.clone())
            .ok_or(RepositoryError::NotFound)
    }

    async fn password_hash(&self, id: UserId) -> Result<String, RepositoryError> {
        let t = self.read().await?;
        t.users
            .get(&id)
            .map(|r| r.password_hash.clone())
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_user(&self, id: UserId, update: &UserUpdate) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        if !t.users.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if t.user_name_or_email_taken(&update.username, &update.email, Some(id)) {
            return Err(RepositoryError::Conflict(
                "username or email already exists".to_owned(),
            ));
        }

        let record = t.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        record.user.username.clone_from(&update.username);
        record.user.email = update.email.clone();
        if let Some(hash) = &update.password_hash {
            record.password_hash.clone_from(hash);
        }
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        t.users.remove(&id).ok_or(RepositoryError::NotFound)?;

        t.user_roles.retain(|(user, _)| *user != id);
        t.tokens.retain(|_, token| token.user != id);
        for record in t.users.values_mut() {
            if record.user.created_by == Some(id) {
                record.user.created_by = None;
            }
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let t = self.read().await?;
        Ok(t.users.values().rev().map(|r| r.user.clone()).collect())
    }

    async fn touch_last_login(&self, id: UserId) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        let record = t.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        record.user.last_login = Some(Utc::now());
        Ok(())
    }
}

// =============================================================================
// Roles and Permissions
// =============================================================================

#[async_trait]
impl RoleStore for MemoryStore {
    async fn insert_role(&self, role: &NewRole) -> Result<RoleId, RepositoryError> {
        let mut t = self.write().await?;
        if t.roles.values().any(|r| r.name == role.name) {
            return Err(RepositoryError::Conflict("role name already exists".to_owned()));
        }

        let id = RoleId::new(next(&mut t.seq.role));
        t.roles.insert(
            id,
            Role {
                id,
                name: role.name.clone(),
                description: role.description.clone(),
            },
        );
        Ok(id)
    }

    async fn get_role(&self, id: RoleId) -> Result<Role, RepositoryError> {
        let t = self.read().await?;
        t.roles.get(&id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn role_by_name(&self, name: &str) -> Result<Role, RepositoryError> {
        let t = self.read().await?;
        t.roles
            .values()
            .find(|r| r.name == name)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_role(&self, id: RoleId, role: &NewRole) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        if !t.roles.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if t.roles.values().any(|r| r.id != id && r.name == role.name) {
            return Err(RepositoryError::Conflict("role name already exists".to_owned()));
        }

        let stored = t.roles.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        stored.name.clone_from(&role.name);
        stored.description.clone_from(&role.description);
        Ok(())
    }

    async fn delete_role(&self, id: RoleId) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        t.roles.remove(&id).ok_or(RepositoryError::NotFound)?;
        t.user_roles.retain(|(_, role)| *role != id);
        t.role_permissions.retain(|(role, _)| *role != id);
        Ok(())
    }

    async fn list_roles(&self) -> Result<Vec<Role>, RepositoryError> {
        let t = self.read().await?;
        Ok(t.roles.values().rev().cloned().collect())
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn insert_permission(
        &self,
        permission: &NewPermission,
    ) -> Result<PermissionId, RepositoryError> {
        let mut t = self.write().await?;
        if t.permissions.values().any(|p| p.name == permission.name) {
            return Err(RepositoryError::Conflict(
                "permission name already exists".to_owned(),
            ));
        }

        let id = PermissionId::new(next(&mut t.seq.permission));
        t.permissions.insert(
            id,
            Permission {
                id,
                name: permission.name.clone(),
                description: permission.description.clone(),
            },
        );
        Ok(id)
    }

    async fn get_permission(&self, id: PermissionId) -> Result<Permission, RepositoryError> {
        let t = self.read().await?;
        t.permissions
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn permission_by_name(&self, name: &str) -> Result<Permission, RepositoryError> {
        let t = self.read().await?;
        t.permissions
            .values()
            .find(|p| p.name.as_str() == name)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_permission(
        &self,
        id: PermissionId,
        permission: &NewPermission,
    ) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        if !t.permissions.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if t
            .permissions
            .values()
            .any(|p| p.id != id && p.name == permission.name)
        {
            return Err(RepositoryError::Conflict(
                "permission name already exists".to_owned(),
            ));
        }

        let stored = t.permissions.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        stored.name = permission.name.clone();
        stored.description.clone_from(&permission.description);
        Ok(())
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        t.permissions.remove(&id).ok_or(RepositoryError::NotFound)?;
        t.role_permissions.retain(|(_, permission)| *permission != id);
        Ok(())
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>, RepositoryError> {
        let t = self.read().await?;
        Ok(t.permissions.values().rev().cloned().collect())
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn insert_user_role(&self, user: UserId, role: RoleId) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        if !t.users.contains_key(&user) || !t.roles.contains_key(&role) {
            return Err(RepositoryError::NotFound);
        }
        if !t.user_roles.insert((user, role)) {
            return Err(RepositoryError::Conflict(
                "role already assigned to user".to_owned(),
            ));
        }
        Ok(())
    }

    async fn delete_user_role(&self, user: UserId, role: RoleId) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        if t.user_roles.remove(&(user, role)) {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn insert_role_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        if !t.roles.contains_key(&role) || !t.permissions.contains_key(&permission) {
            return Err(RepositoryError::NotFound);
        }
        if !t.role_permissions.insert((role, permission)) {
            return Err(RepositoryError::Conflict(
                "permission already assigned to role".to_owned(),
            ));
        }
        Ok(())
    }

    async fn delete_role_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        if t.role_permissions.remove(&(role, permission)) {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn roles_for_user(&self, user: UserId) -> Result<Vec<Role>, RepositoryError> {
        let t = self.read().await?;
        Ok(t.roles
            .values()
            .rev()
            .filter(|r| t.user_roles.contains(&(user, r.id)))
            .cloned()
            .collect())
    }

    async fn permissions_for_role(
        &self,
        role: RoleId,
    ) -> Result<Vec<Permission>, RepositoryError> {
        let t = self.read().await?;
        Ok(t.permissions
            .values()
            .rev()
            .filter(|p| t.role_permissions.contains(&(role, p.id)))
            .cloned()
            .collect())
    }

    async fn permission_names_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<PermissionName>, RepositoryError> {
        let t = self.read().await?;
        let names: BTreeSet<PermissionName> = t
            .user_roles
            .iter()
            .filter(|(u, _)| *u == user)
            .flat_map(|(_, role)| {
                t.role_permissions
                    .iter()
                    .filter(move |(r, _)| r == role)
                    .filter_map(|(_, p)| t.permissions.get(p))
                    .map(|p| p.name.clone())
            })
            .collect();
        Ok(names.into_iter().collect())
    }
}

// =============================================================================
// Directory
// =============================================================================

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn insert_firm_with_contacts(
        &self,
        firm: &FirmFields,
        contact_ids: &[ContactId],
    ) -> Result<FirmId, RepositoryError> {
        let mut t = self.write().await?;

        // Every link is validated before anything is written.
        let mut seen = BTreeSet::new();
        for contact_id in contact_ids {
            if !t.contacts.contains_key(contact_id) {
                return Err(RepositoryError::Transaction(format!(
                    "linking contact {contact_id}: referenced row does not exist"
                )));
            }
            if !seen.insert(*contact_id) {
                return Err(RepositoryError::Transaction(format!(
                    "linking contact {contact_id}: link already exists"
                )));
            }
        }

        let id = FirmId::new(next(&mut t.seq.firm));
        t.firms.insert(
            id,
            Firm {
                id,
                fields: firm.clone(),
                created_at: Utc::now(),
            },
        );
        t.firm_contacts.extend(seen.into_iter().map(|c| (id, c)));
        Ok(id)
    }

    async fn insert_contact_with_firms(
        &self,
        contact: &ContactFields,
        firm_ids: &[FirmId],
    ) -> Result<ContactId, RepositoryError> {
        let mut t = self.write().await?;
        if t.contact_email_taken(&contact.email, None) {
            return Err(RepositoryError::Conflict(
                "contact email already exists".to_owned(),
            ));
        }

        let mut seen = BTreeSet::new();
        for firm_id in firm_ids {
            if !t.firms.contains_key(firm_id) {
                return Err(RepositoryError::Transaction(format!(
                    "linking firm {firm_id}: referenced row does not exist"
                )));
            }
            if !seen.insert(*firm_id) {
                return Err(RepositoryError::Transaction(format!(
                    "linking firm {firm_id}: link already exists"
                )));
            }
        }

        let id = ContactId::new(next(&mut t.seq.contact));
        t.contacts.insert(
            id,
            Contact {
                id,
                fields: contact.clone(),
                created_at: Utc::now(),
            },
        );
        t.firm_contacts.extend(seen.into_iter().map(|f| (f, id)));
        Ok(id)
    }

    async fn get_firm(&self, id: FirmId) -> Result<Firm, RepositoryError> {
        let t = self.read().await?;
        t.firms.get(&id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn update_firm(&self, id: FirmId, firm: &FirmFields) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        let stored = t.firms.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        stored.fields = firm.clone();
        Ok(())
    }

    async fn delete_firm(&self, id: FirmId) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        t.firms.remove(&id).ok_or(RepositoryError::NotFound)?;
        t.firm_contacts.retain(|(firm, _)| *firm != id);
        Ok(())
    }

    async fn list_firms(&self) -> Result<Vec<Firm>, RepositoryError> {
        let t = self.read().await?;
        Ok(t.firms.values().rev().cloned().collect())
    }

    async fn get_contact(&self, id: ContactId) -> Result<Contact, RepositoryError> {
        let t = self.read().await?;
        t.contacts.get(&id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn update_contact(
        &self,
        id: ContactId,
        contact: &ContactFields,
    ) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        if !t.contacts.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if t.contact_email_taken(&contact.email, Some(id)) {
            return Err(RepositoryError::Conflict(
                "contact email already exists".to_owned(),
            ));
        }

        let stored = t.contacts.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        stored.fields = contact.clone();
        Ok(())
    }

    async fn delete_contact(&self, id: ContactId) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        t.contacts.remove(&id).ok_or(RepositoryError::NotFound)?;
        t.firm_contacts.retain(|(_, contact)| *contact != id);
        Ok(())
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>, RepositoryError> {
        let t = self.read().await?;
        Ok(t.contacts.values().rev().cloned().collect())
    }

    async fn firms_for_contact(&self, contact: ContactId) -> Result<Vec<Firm>, RepositoryError> {
        let t = self.read().await?;
        Ok(t.firms
            .values()
            .rev()
            .filter(|f| t.firm_contacts.contains(&(f.id, contact)))
            .cloned()
            .collect())
    }

    async fn contacts_for_firm(&self, firm: FirmId) -> Result<Vec<Contact>, RepositoryError> {
        let t = self.read().await?;
        Ok(t.contacts
            .values()
            .rev()
            .filter(|c| t.firm_contacts.contains(&(firm, c.id)))
            .cloned()
            .collect())
    }
}

// =============================================================================
// Devices
// =============================================================================

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn insert_device(&self, device: &DeviceFields) -> Result<DeviceId, RepositoryError> {
        let mut t = self.write().await?;
        let id = DeviceId::new(next(&mut t.seq.device));
        t.devices.insert(
            id,
            Device {
                id,
                fields: device.clone(),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn get_device(&self, id: DeviceId) -> Result<Device, RepositoryError> {
        let t = self.read().await?;
        t.devices.get(&id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn update_device(
        &self,
        id: DeviceId,
        device: &DeviceFields,
    ) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        let stored = t.devices.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        stored.fields = device.clone();
        Ok(())
    }

    async fn delete_device(&self, id: DeviceId) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        t.devices.remove(&id).ok_or(RepositoryError::NotFound)?;
        t.device_links.retain(|_, link| {
            link.fields.from_device_id != id && link.fields.to_device_id != id
        });
        Ok(())
    }

    async fn list_devices(&self) -> Result<Vec<Device>, RepositoryError> {
        let t = self.read().await?;
        Ok(t.devices.values().rev().cloned().collect())
    }

    async fn insert_device_link(
        &self,
        link: &DeviceLinkFields,
    ) -> Result<DeviceLinkId, RepositoryError> {
        let mut t = self.write().await?;
        if !t.link_devices_exist(link) {
            return Err(RepositoryError::NotFound);
        }

        let id = DeviceLinkId::new(next(&mut t.seq.device_link));
        t.device_links.insert(id, DeviceLink { id, fields: *link });
        Ok(id)
    }

    async fn get_device_link(&self, id: DeviceLinkId) -> Result<DeviceLink, RepositoryError> {
        let t = self.read().await?;
        t.device_links
            .get(&id)
            .copied()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_device_link(
        &self,
        id: DeviceLinkId,
        link: &DeviceLinkFields,
    ) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        if !t.link_devices_exist(link) {
            return Err(RepositoryError::NotFound);
        }
        let stored = t.device_links.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        stored.fields = *link;
        Ok(())
    }

    async fn delete_device_link(&self, id: DeviceLinkId) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        t.device_links
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_device_links(&self) -> Result<Vec<DeviceLink>, RepositoryError> {
        let t = self.read().await?;
        Ok(t.device_links.values().rev().copied().collect())
    }

    async fn links_from_device(
        &self,
        device: DeviceId,
    ) -> Result<Vec<DeviceLink>, RepositoryError> {
        let t = self.read().await?;
        Ok(t.device_links
            .values()
            .rev()
            .filter(|l| l.fields.from_device_id == device)
            .copied()
            .collect())
    }
}

// =============================================================================
// Tokens
// =============================================================================

#[async_trait]
impl TokenStore for MemoryStore {
    async fn insert_token(
        &self,
        token_hash: &str,
        user: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        if !t.users.contains_key(&user) {
            return Err(RepositoryError::NotFound);
        }
        if t.tokens.contains_key(token_hash) {
            return Err(RepositoryError::Conflict("duplicate entry".to_owned()));
        }
        t.tokens
            .insert(token_hash.to_owned(), TokenRecord { user, expires_at });
        Ok(())
    }

    async fn user_for_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<UserId, RepositoryError> {
        let t = self.read().await?;
        t.tokens
            .get(token_hash)
            .filter(|token| token.expires_at > now)
            .map(|token| token.user)
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_token(&self, token_hash: &str) -> Result<(), RepositoryError> {
        let mut t = self.write().await?;
        t.tokens
            .remove(token_hash)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut t = self.write().await?;
        let before = t.tokens.len();
        t.tokens.retain(|_, token| token.expires_at > now);
        Ok(u64::try_from(before - t.tokens.len()).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn setup_schema(&self) -> Result<(), RepositoryError> {
        self.check_available()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.check_available()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_owned(),
            email: Email::parse(&format!("{name}@example.com")).unwrap(),
            password_hash: "hash".to_owned(),
            created_by: None,
        }
    }

    fn contact(email: &str) -> ContactFields {
        ContactFields {
            first_name: "Eva".to_owned(),
            email: email.to_owned(),
            ..ContactFields::default()
        }
    }

    #[tokio::test]
    async fn test_lists_are_newest_first() {
        let store = MemoryStore::new();
        let a = store.insert_user(&new_user("a")).await.unwrap();
        let b = store.insert_user(&new_user("b")).await.unwrap();

        let ids: Vec<UserId> = store
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryStore::new();
        store.insert_user(&new_user("a")).await.unwrap();
        let mut again = new_user("a");
        again.email = Email::parse("other@example.com").unwrap();

        assert!(matches!(
            store.insert_user(&again).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_user_clears_created_by() {
        let store = MemoryStore::new();
        let admin = store.insert_user(&new_user("admin")).await.unwrap();
        let mut child = new_user("child");
        child.created_by = Some(admin);
        let child = store.insert_user(&child).await.unwrap();

        store.delete_user(admin).await.unwrap();
        assert_eq!(store.get_user(child).await.unwrap().created_by, None);
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let store = MemoryStore::new();
        let result = store
            .update_firm(FirmId::new(99), &FirmFields::default())
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_failed_firm_insert_writes_nothing() {
        let store = MemoryStore::new();
        let c1 = store
            .insert_contact_with_firms(&contact("c1@example.com"), &[])
            .await
            .unwrap();

        let result = store
            .insert_firm_with_contacts(&FirmFields::default(), &[c1, ContactId::new(999)])
            .await;

        assert!(matches!(result, Err(RepositoryError::Transaction(_))));
        assert!(store.list_firms().await.unwrap().is_empty());
        assert!(store.firms_for_contact(c1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_contact_id_rolls_back() {
        let store = MemoryStore::new();
        let c1 = store
            .insert_contact_with_firms(&contact("c1@example.com"), &[])
            .await
            .unwrap();

        let result = store
            .insert_firm_with_contacts(&FirmFields::default(), &[c1, c1])
            .await;
        assert!(matches!(result, Err(RepositoryError::Transaction(_))));
        assert!(store.list_firms().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_contact_email_is_unique() {
        let store = MemoryStore::new();
        store
            .insert_contact_with_firms(&contact("same@example.com"), &[])
            .await
            .unwrap();
        let result = store
            .insert_contact_with_firms(&contact("same@example.com"), &[])
            .await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_device_cascades_links() {
        let store = MemoryStore::new();
        let a = store.insert_device(&DeviceFields::default()).await.unwrap();
        let b = store.insert_device(&DeviceFields::default()).await.unwrap();
        store
            .insert_device_link(&DeviceLinkFields {
                from_device_id: a,
                to_device_id: b,
            })
            .await
            .unwrap();

        store.delete_device(b).await.unwrap();
        assert!(store.links_from_device(a).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_link_to_unknown_device_is_not_found() {
        let store = MemoryStore::new();
        let a = store.insert_device(&DeviceFields::default()).await.unwrap();
        let result = store
            .insert_device_link(&DeviceLinkFields {
                from_device_id: a,
                to_device_id: DeviceId::new(42),
            })
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_expired_token_is_not_found() {
        let store = MemoryStore::new();
        let user = store.insert_user(&new_user("a")).await.unwrap();
        let now = Utc::now();
        store
            .insert_token("digest", user, now - chrono::Duration::minutes(1))
            .await
            .unwrap();

        assert!(matches!(
            store.user_for_token("digest", now).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.list_roles().await,
            Err(RepositoryError::Unavailable(_))
        ));
        assert!(matches!(store.ping().await, Err(RepositoryError::Unavailable(_))));

        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }
}
