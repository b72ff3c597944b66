//! Persistence for the addressbook backend.
//!
//! # Databases
//!
//! - main database: users, roles, permissions, their junctions, firms,
//!   contacts, `firm_contacts`, `auth_tokens`
//! - device database: `devices`, `device_links` (may be the same database
//!   when no separate device connection is configured)
//!
//! # Backends
//!
//! - [`PgStore`] - `PostgreSQL` via sqlx, used in production
//! - [`MemoryStore`] - in-process tables with the same uniqueness, cascade
//!   and atomicity rules, used by tests and `APP_STORE=memory`
//!
//! # Schema
//!
//! There are no versioned migrations. [`Store::setup_schema`] issues
//! `CREATE TABLE IF NOT EXISTS` statements and runs on every start.

pub mod memory;
pub mod postgres;
pub mod schema;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use thiserror::Error;

use crate::config::{AppConfig, ConfigError, StoreBackend};

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{
    AssignmentStore, DeviceStore, DirectoryStore, PermissionStore, RoleStore, Store, TokenStore,
    UserStore,
};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx that has no more specific meaning.
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// The database could not be reached.
    #[error("database unavailable: {0}")]
    Unavailable(String),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity or junction pair was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate name or pair).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A multi-row operation failed part-way and was rolled back.
    #[error("transaction rolled back: {0}")]
    Transaction(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        classify(e, "duplicate entry")
    }
}

/// Map a sqlx error onto the repository taxonomy.
///
/// `conflict` is the message used when a unique constraint fired.
pub(crate) fn classify(e: sqlx::Error, conflict: &str) -> RepositoryError {
    match e {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            RepositoryError::Conflict(conflict.to_owned())
        }
        sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
            RepositoryError::NotFound
        }
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => RepositoryError::Unavailable(e.to_string()),
        other => RepositoryError::Database(other),
    }
}

/// Pool sizing and the bounded retry used for the first connection.
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    /// Total connection attempts before giving up (at least one is made).
    pub connect_attempts: u32,
    /// Fixed pause between attempts.
    pub retry_delay: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(10),
            connect_attempts: 5,
            retry_delay: Duration::from_secs(3),
        }
    }
}

/// Create a `PostgreSQL` connection pool, retrying the initial connection.
///
/// Each failed attempt is logged at WARN; after `connect_attempts` failures
/// the last error is returned. Callers at startup treat that as fatal.
///
/// # Errors
///
/// Returns `RepositoryError::Unavailable` when every attempt failed.
pub async fn connect_with_retry(
    label: &str,
    options: PgConnectOptions,
    settings: PoolSettings,
) -> Result<PgPool, RepositoryError> {
    let attempts = settings.connect_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        let result = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(options.clone())
            .await;

        match result {
            Ok(pool) => {
                tracing::info!(database = label, attempt, "Database pool created");
                return Ok(pool);
            }
            Err(e) => {
                tracing::warn!(
                    database = label,
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    "Database connection failed"
                );
                last_error = e.to_string();
                if attempt < attempts {
                    tokio::time::sleep(settings.retry_delay).await;
                }
            }
        }
    }

    Err(RepositoryError::Unavailable(format!(
        "{label}: gave up after {attempts} attempts: {last_error}"
    )))
}

/// Errors from [`open_store`].
#[derive(Debug, Error)]
pub enum OpenStoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Open the configured backend.
///
/// For `PostgreSQL` this connects the main pool and, if configured, the
/// device pool, each with the bounded retry from [`connect_with_retry`].
///
/// # Errors
///
/// Returns `OpenStoreError` if a connection URL is malformed or a database
/// stays unreachable.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn Store>, OpenStoreError> {
    match config.store {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on exit");
            Ok(MemoryStore::new_shared())
        }
        StoreBackend::Postgres => {
            let options = config.database.connect_options("DATABASE_URL")?;
            let pool = connect_with_retry("main", options, config.pool).await?;

            let device_pool = match &config.device_database {
                Some(device) => {
                    let options = device.connect_options("DEVICE_DATABASE_URL")?;
                    Some(connect_with_retry("device", options, config.pool).await?)
                }
                None => None,
            };

            Ok(Arc::new(PgStore::new(pool, device_pool)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            classify(sqlx::Error::RowNotFound, "x"),
            RepositoryError::NotFound
        ));
    }

    #[test]
    fn test_pool_errors_map_to_unavailable() {
        assert!(matches!(
            classify(sqlx::Error::PoolTimedOut, "x"),
            RepositoryError::Unavailable(_)
        ));
        assert!(matches!(
            RepositoryError::from(sqlx::Error::PoolClosed),
            RepositoryError::Unavailable(_)
        ));
    }

    #[test]
    fn test_other_errors_stay_database() {
        assert!(matches!(
            classify(sqlx::Error::ColumnNotFound("id".to_owned()), "x"),
            RepositoryError::Database(_)
        ));
    }

    #[test]
    fn test_default_pool_settings_match_startup_policy() {
        let settings = PoolSettings::default();
        assert_eq!(settings.connect_attempts, 5);
        assert_eq!(settings.retry_delay, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_connect_with_retry_gives_up() {
        let options = PgConnectOptions::new()
            .host("127.0.0.1")
            .port(1)
            .username("nobody")
            .database("nothing");
        let settings = PoolSettings {
            min_connections: 1,
            acquire_timeout: Duration::from_millis(200),
            connect_attempts: 2,
            retry_delay: Duration::from_millis(10),
            ..PoolSettings::default()
        };

        let result = connect_with_retry("test", options, settings).await;
        assert!(matches!(result, Err(RepositoryError::Unavailable(_))));
    }
}
