//! User management commands.
//!
//! # Environment Variables
//!
//! - `AB_CLI_PASSWORD` - password for `user create` when `--password` is omitted

use addressbook_server::config::get_required_env;
use addressbook_server::db::RepositoryError;
use addressbook_server::services::{AuthService, RelationshipManager};

use super::{CommandError, connect};

/// Create a user with no roles.
///
/// # Errors
///
/// Returns `CommandError` for invalid input, a taken username or email, or
/// a missing password.
pub async fn create(
    username: &str,
    email: &str,
    password: Option<String>,
) -> Result<(), CommandError> {
    let password = match password {
        Some(password) => password,
        None => get_required_env("AB_CLI_PASSWORD")?,
    };

    let (config, store) = connect().await?;
    let user = AuthService::new(store.as_ref(), config.token_ttl)
        .create_user(username, email, &password, None)
        .await?;

    tracing::info!(
        "User created! ID: {}, Username: {}, Email: {}",
        user.id,
        user.username,
        user.email
    );
    Ok(())
}

/// Assign a role to a user by name. Granting a role the user already holds
/// is not an error.
///
/// # Errors
///
/// Returns `CommandError::UnknownUser` or `CommandError::UnknownRole` if
/// either name does not exist.
pub async fn grant_role(username: &str, role: &str) -> Result<(), CommandError> {
    let (_, store) = connect().await?;

    let user = store.user_by_username(username).await.map_err(|e| match e {
        RepositoryError::NotFound => CommandError::UnknownUser(username.to_owned()),
        other => other.into(),
    })?;
    let role_row = store.role_by_name(role).await.map_err(|e| match e {
        RepositoryError::NotFound => CommandError::UnknownRole(role.to_owned()),
        other => other.into(),
    })?;

    match RelationshipManager::new(store.as_ref())
        .assign(user.id, role_row.id)
        .await
    {
        Ok(()) => tracing::info!("Granted role {role} to {username}"),
        Err(RepositoryError::Conflict(_)) => {
            tracing::info!("{username} already has role {role}");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
