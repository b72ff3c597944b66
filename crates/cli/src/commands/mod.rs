//! Command implementations.

pub mod schema;
pub mod seed;
pub mod user;

use std::sync::Arc;

use thiserror::Error;

use addressbook_server::config::{AppConfig, ConfigError, StoreBackend};
use addressbook_server::db::{OpenStoreError, RepositoryError, Store, open_store};
use addressbook_server::services::{AuthError, SeedError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("could not open store: {0}")]
    Store(#[from] OpenStoreError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Seed(#[from] SeedError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("no user named {0}")]
    UnknownUser(String),

    #[error("no role named {0}")]
    UnknownRole(String),
}

/// Load the server configuration and open its store.
async fn connect() -> Result<(AppConfig, Arc<dyn Store>), CommandError> {
    let config = AppConfig::from_env()?;
    if config.store == StoreBackend::Memory {
        tracing::warn!("APP_STORE=memory: changes are discarded when the command exits");
    }

    let store = open_store(&config).await?;
    Ok((config, store))
}
