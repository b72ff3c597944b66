//! `PostgreSQL` backend.
//!
//! Queries use the runtime `sqlx::query_as` API against private row types,
//! converted into domain models with `TryFrom`. Multi-row writes run inside
//! `pool.begin()` transactions that roll back when dropped uncommitted.

mod devices;
mod directory;
mod rbac;
mod tokens;
mod users;

use async_trait::async_trait;
use sqlx::PgPool;

use super::{RepositoryError, Store, schema};

/// Store backed by one or two `PostgreSQL` pools.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    device_pool: PgPool,
}

impl PgStore {
    /// Create a store. Without a dedicated device pool the device tables
    /// live in the main database.
    #[must_use]
    pub fn new(pool: PgPool, device_pool: Option<PgPool>) -> Self {
        let device_pool = device_pool.unwrap_or_else(|| pool.clone());
        Self { pool, device_pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn setup_schema(&self) -> Result<(), RepositoryError> {
        schema::apply(&self.pool, schema::MAIN_SCHEMA).await?;
        schema::apply(&self.device_pool, schema::DEVICE_SCHEMA).await?;
        tracing::info!("Database schema ready");
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        sqlx::query("SELECT 1").execute(&self.device_pool).await?;
        Ok(())
    }
}

/// Turn a zero-row `UPDATE`/`DELETE` into `NotFound`.
fn expect_one(result: &sqlx::postgres::PgQueryResult) -> Result<(), RepositoryError> {
    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}
