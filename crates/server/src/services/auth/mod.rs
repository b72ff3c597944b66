//! Authentication service.
//!
//! Password accounts with argon2 hashes and opaque bearer tokens. A token is
//! 32 random bytes, base64url-encoded for the client; the store only ever
//! sees its SHA-256 hex digest.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::instrument;

use addressbook_core::{Email, UserId};

use crate::db::{RepositoryError, Store};
use crate::models::{NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Role given to self-registered users when it exists.
pub const DEFAULT_ROLE: &str = "user";

const TOKEN_BYTES: usize = 32;

/// A freshly issued bearer token.
#[derive(Clone)]
pub struct IssuedToken {
    /// The raw token; shown to the client once and never stored.
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Authentication service.
///
/// Handles registration, login, token resolution and logout.
#[derive(Clone, Copy)]
pub struct AuthService<'a> {
    store: &'a dyn Store,
    token_ttl: Duration,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, token_ttl: Duration) -> Self {
        Self { store, token_ttl }
    }

    /// Create an account.
    ///
    /// The username is trimmed; the email is trimmed and lowercased.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername`, `AuthError::InvalidEmail` or
    /// `AuthError::WeakPassword` for bad input, and
    /// `AuthError::UserAlreadyExists` if the username or email is taken.
    #[instrument(skip(self, email, password))]
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        created_by: Option<UserId>,
    ) -> Result<User, AuthError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::InvalidUsername);
        }
        let email = Email::normalized(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let id = self
            .store
            .insert_user(&NewUser {
                username: username.to_owned(),
                email,
                password_hash,
                created_by,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %id, "User created");
        Ok(self.store.get_user(id).await?)
    }

    /// Self-registration: [`Self::create_user`] plus the default role.
    ///
    /// A missing default role or a failed assignment is logged and does not
    /// fail the registration.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_user`].
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let user = self.create_user(username, email, password, None).await?;

        match self.store.role_by_name(DEFAULT_ROLE).await {
            Ok(role) => {
                if let Err(e) = self.store.insert_user_role(user.id, role.id).await {
                    tracing::warn!(user_id = %user.id, error = %e, "Could not assign default role");
                }
            }
            Err(RepositoryError::NotFound) => {
                tracing::debug!(role = DEFAULT_ROLE, "Default role does not exist");
            }
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Could not look up default role");
            }
        }

        Ok(user)
    }

    /// Login with a username or email and a password, issuing a token.
    ///
    /// An identifier containing `@` is treated as an email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown identifier or
    /// a wrong password (indistinguishably).
    #[instrument(skip(self, identifier, password))]
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<(User, IssuedToken), AuthError> {
        let identifier = identifier.trim();
        let lookup = if identifier.contains('@') {
            let email = Email::normalized(identifier).map_err(|_| AuthError::InvalidCredentials)?;
            self.store.user_by_email(&email).await
        } else {
            self.store.user_by_username(identifier).await
        };
        let user = lookup.map_err(|e| match e {
            RepositoryError::NotFound => AuthError::InvalidCredentials,
            other => AuthError::Repository(other),
        })?;

        let password_hash = self.store.password_hash(user.id).await?;
        verify_password(password, &password_hash)?;

        self.store.touch_last_login(user.id).await?;
        let issued = self.issue_token(user.id).await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok((user, issued))
    }

    /// Resolve a raw bearer token to its owner; `None` if unknown or expired.
    ///
    /// # Errors
    ///
    /// Propagates store failures other than `NotFound`.
    pub async fn resolve_token(&self, token: &str) -> Result<Option<UserId>, AuthError> {
        match self.store.user_for_token(&token_digest(token), Utc::now()).await {
            Ok(user) => Ok(Some(user)),
            Err(RepositoryError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Revoke a raw bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the token is unknown.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.store
            .delete_token(&token_digest(token))
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::InvalidCredentials,
                other => AuthError::Repository(other),
            })
    }

    async fn issue_token(&self, user: UserId) -> Result<IssuedToken, AuthError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);
        let now = Utc::now();
        let expires_at = now + self.token_ttl;

        let purged = self.store.delete_expired_tokens(now).await?;
        if purged > 0 {
            tracing::debug!(purged, "Removed expired tokens");
        }

        self.store
            .insert_token(&token_digest(&token), user, expires_at)
            .await?;

        Ok(IssuedToken { token, expires_at })
    }
}

/// SHA-256 hex digest of a raw token, the only form that is persisted.
#[must_use]
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Validate password requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if shorter than the minimum length.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{AssignmentStore, MemoryStore, RoleStore, TokenStore, UserStore};
    use crate::models::NewRole;

    fn service(store: &MemoryStore) -> AuthService<'_> {
        AuthService::new(store, Duration::minutes(5))
    }

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_short_password_is_rejected() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_token_digest_is_sha256_hex() {
        let digest = token_digest("abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_register_normalizes_and_assigns_default_role() {
        let store = MemoryStore::new();
        let role = store
            .insert_role(&NewRole {
                name: DEFAULT_ROLE.to_owned(),
                description: String::new(),
            })
            .await
            .unwrap();

        let user = service(&store)
            .register("  alice ", " Alice@Example.com ", "password123")
            .await
            .unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.email.as_str(), "alice@example.com");
        let roles = store.roles_for_user(user.id).await.unwrap();
        assert_eq!(roles.iter().map(|r| r.id).collect::<Vec<_>>(), vec![role]);
    }

    #[tokio::test]
    async fn test_register_duplicate_is_conflict() {
        let store = MemoryStore::new();
        let auth = service(&store);
        auth.register("alice", "alice@example.com", "password123")
            .await
            .unwrap();

        let again = auth
            .register("alice", "other@example.com", "password123")
            .await;
        assert!(matches!(again, Err(AuthError::UserAlreadyExists)));
    }

    #[tokio::test]
    async fn test_login_by_username_or_email_issues_resolvable_token() {
        let store = MemoryStore::new();
        let auth = service(&store);
        let user = auth
            .register("alice", "alice@example.com", "password123")
            .await
            .unwrap();

        let (_, by_name) = auth.login("alice", "password123").await.unwrap();
        let (_, by_email) = auth.login("ALICE@example.com", "password123").await.unwrap();

        assert_ne!(by_name.token, by_email.token);
        assert_eq!(auth.resolve_token(&by_name.token).await.unwrap(), Some(user.id));
        assert!(store.get_user(user.id).await.unwrap().last_login.is_some());
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let store = MemoryStore::new();
        let auth = service(&store);
        auth.register("alice", "alice@example.com", "password123")
            .await
            .unwrap();

        assert!(matches!(
            auth.login("alice", "wrong-password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody", "password123").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let store = MemoryStore::new();
        let auth = service(&store);
        auth.register("alice", "alice@example.com", "password123")
            .await
            .unwrap();
        let (_, issued) = auth.login("alice", "password123").await.unwrap();

        auth.logout(&issued.token).await.unwrap();
        assert_eq!(auth.resolve_token(&issued.token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_purges_expired_tokens() {
        let store = MemoryStore::new();
        let auth = service(&store);
        let user = auth
            .register("alice", "alice@example.com", "password123")
            .await
            .unwrap();
        let stale = token_digest("stale");
        store
            .insert_token(&stale, user.id, Utc::now() - Duration::minutes(1))
            .await
            .unwrap();

        let (_, fresh) = auth.login("alice", "password123").await.unwrap();

        assert!(matches!(
            store.delete_token(&stale).await,
            Err(RepositoryError::NotFound)
        ));
        assert_eq!(auth.resolve_token(&fresh.token).await.unwrap(), Some(user.id));
    }
}
