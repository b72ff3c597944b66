//! Relationship manager.
//!
//! Owns the many-to-many writes: firm↔contact inserts (one transaction per
//! call) and the user↔role / role↔permission junctions. The junction's
//! composite unique key is the only concurrency guard; a lost race surfaces
//! as `Conflict`.

use tracing::instrument;

use addressbook_core::{ContactId, FirmId, PermissionId, RoleId, UserId};

use crate::db::{RepositoryError, Store};
use crate::models::{ContactFields, FirmFields};

/// Relationship operations over any [`Store`].
#[derive(Clone, Copy)]
pub struct RelationshipManager<'a> {
    store: &'a dyn Store,
}

impl<'a> RelationshipManager<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Insert a firm and link it to each contact, all or nothing.
    ///
    /// An empty list inserts the firm alone.
    ///
    /// # Errors
    ///
    /// `Transaction` if any link fails (nothing is persisted), otherwise the
    /// store error of the firm insert.
    #[instrument(skip(self, firm), fields(contacts = contact_ids.len()))]
    pub async fn insert_firm_with_contacts(
        &self,
        firm: &FirmFields,
        contact_ids: &[ContactId],
    ) -> Result<FirmId, RepositoryError> {
        let firm_id = self
            .store
            .insert_firm_with_contacts(firm, contact_ids)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Firm insert rolled back"))?;

        tracing::info!(firm_id = %firm_id, "Firm created");
        Ok(firm_id)
    }

    /// Insert a contact and link it to each firm, all or nothing.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::insert_firm_with_contacts`]; a duplicate
    /// contact email is `Conflict`.
    #[instrument(skip(self, contact), fields(firms = firm_ids.len()))]
    pub async fn insert_contact_with_firms(
        &self,
        contact: &ContactFields,
        firm_ids: &[FirmId],
    ) -> Result<ContactId, RepositoryError> {
        let contact_id = self
            .store
            .insert_contact_with_firms(contact, firm_ids)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Contact insert rolled back"))?;

        tracing::info!(contact_id = %contact_id, "Contact created");
        Ok(contact_id)
    }

    /// Give a user a role.
    ///
    /// # Errors
    ///
    /// `Conflict` if already assigned, `NotFound` if the user or role does
    /// not exist.
    #[instrument(skip(self))]
    pub async fn assign(&self, user: UserId, role: RoleId) -> Result<(), RepositoryError> {
        self.store.insert_user_role(user, role).await?;
        tracing::info!("Role assigned");
        Ok(())
    }

    /// Take a role away from a user.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user did not hold the role.
    #[instrument(skip(self))]
    pub async fn unassign(&self, user: UserId, role: RoleId) -> Result<(), RepositoryError> {
        self.store.delete_user_role(user, role).await?;
        tracing::info!("Role unassigned");
        Ok(())
    }

    /// Grant a permission to a role.
    ///
    /// # Errors
    ///
    /// `Conflict` if already granted, `NotFound` if the role or permission
    /// does not exist.
    #[instrument(skip(self))]
    pub async fn assign_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<(), RepositoryError> {
        self.store.insert_role_permission(role, permission).await?;
        tracing::info!("Permission assigned");
        Ok(())
    }

    /// Revoke a permission from a role.
    ///
    /// # Errors
    ///
    /// `NotFound` if the role did not have the permission.
    #[instrument(skip(self))]
    pub async fn unassign_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<(), RepositoryError> {
        self.store.delete_role_permission(role, permission).await?;
        tracing::info!("Permission unassigned");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{DirectoryStore, MemoryStore, RoleStore};
    use crate::models::NewRole;

    #[tokio::test]
    async fn test_assign_unknown_user_is_not_found() {
        let store = MemoryStore::new();
        let role = store
            .insert_role(&NewRole {
                name: "viewer".to_owned(),
                description: String::new(),
            })
            .await
            .unwrap();

        let result = RelationshipManager::new(&store)
            .assign(UserId::new(7), role)
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_empty_contact_list_inserts_firm_alone() {
        let store = MemoryStore::new();
        let manager = RelationshipManager::new(&store);

        let firm = manager
            .insert_firm_with_contacts(&FirmFields::default(), &[])
            .await
            .unwrap();
        assert!(store.contacts_for_firm(firm).await.unwrap().is_empty());
    }
}
