//! Effective permissions.

use std::collections::BTreeSet;

use tracing::instrument;

use addressbook_core::{PermissionName, UserId};

use crate::db::{RepositoryError, Store};

/// Computes the union of permissions over every role a user holds.
///
/// Nothing is cached: each call reads the junction tables, so a grant or
/// revocation is visible to the very next check.
#[derive(Clone, Copy)]
pub struct PermissionResolver<'a> {
    store: &'a dyn Store,
}

impl<'a> PermissionResolver<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Deduplicated permission names for a user. Unknown users and users
    /// without roles get an empty set.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    #[instrument(skip(self))]
    pub async fn permissions_for_user(
        &self,
        user: UserId,
    ) -> Result<BTreeSet<PermissionName>, RepositoryError> {
        let names = self.store.permission_names_for_user(user).await?;
        Ok(names.into_iter().collect())
    }

    /// Whether the user holds `permission` through any role.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn has_permission(
        &self,
        user: UserId,
        permission: &str,
    ) -> Result<bool, RepositoryError> {
        Ok(self.permissions_for_user(user).await?.contains(permission))
    }
}
