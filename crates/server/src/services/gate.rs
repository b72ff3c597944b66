//! Authorization gate.
//!
//! Three outcomes, checked in order:
//!
//! 1. no identity: [`AuthzError::Unauthenticated`], the resolver is not consulted
//! 2. identity without the permission: [`AuthzError::Forbidden`]
//! 3. otherwise the caller's ID is returned
//!
//! A resolver failure is logged with full detail and reported as
//! `Forbidden`, so a store outage never opens a protected route.

use thiserror::Error;

use addressbook_core::UserId;

use super::PermissionResolver;
use crate::db::Store;

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    /// No valid bearer token was presented.
    #[error("authentication required")]
    Unauthenticated,

    /// The caller lacks the named permission.
    #[error("missing permission: {0}")]
    Forbidden(String),
}

/// Stateless permission check, cheap to copy into every handler.
#[derive(Clone, Copy)]
pub struct AuthorizationGate<'a> {
    resolver: PermissionResolver<'a>,
}

impl<'a> AuthorizationGate<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self {
            resolver: PermissionResolver::new(store),
        }
    }

    /// Check that `identity` holds `required`.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without an identity, `Forbidden` when the
    /// permission is missing or could not be resolved.
    pub async fn authorize(
        &self,
        identity: Option<UserId>,
        required: &str,
    ) -> Result<UserId, AuthzError> {
        let Some(user) = identity else {
            return Err(AuthzError::Unauthenticated);
        };

        match self.resolver.has_permission(user, required).await {
            Ok(true) => Ok(user),
            Ok(false) => {
                tracing::debug!(user_id = %user, permission = required, "Permission denied");
                Err(AuthzError::Forbidden(required.to_owned()))
            }
            Err(e) => {
                tracing::error!(
                    user_id = %user,
                    permission = required,
                    error = %e,
                    "Permission lookup failed"
                );
                Err(AuthzError::Forbidden(required.to_owned()))
            }
        }
    }
}

/// Check only that a caller is authenticated.
///
/// # Errors
///
/// `Unauthenticated` when `identity` is `None`.
pub const fn require_identity(identity: Option<UserId>) -> Result<UserId, AuthzError> {
    match identity {
        Some(user) => Ok(user),
        None => Err(AuthzError::Unauthenticated),
    }
}
