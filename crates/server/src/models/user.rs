//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use addressbook_core::{Email, UserId};

/// A user account (domain type).
///
/// The password hash is deliberately absent; it is only read through
/// [`UserStore::password_hash`](crate::db::UserStore::password_hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name (unique).
    pub username: String,
    /// Email address (unique, normalized).
    pub email: Email,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// The user who created this account, if any.
    pub created_by: Option<UserId>,
    /// Last successful login.
    pub last_login: Option<DateTime<Utc>>,
}

/// Input for creating a user.
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Email,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub created_by: Option<UserId>,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("created_by", &self.created_by)
            .finish()
    }
}

/// Full-row replacement for a user.
///
/// `password_hash` of `None` keeps the stored hash.
#[derive(Clone)]
pub struct UserUpdate {
    pub username: String,
    pub email: Email,
    pub password_hash: Option<String>,
}

impl std::fmt::Debug for UserUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserUpdate")
            .field("username", &self.username)
            .field("email", &self.email)
            .field(
                "password_hash",
                &self.password_hash.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}
