//! Bearer token digests for the `PostgreSQL` backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use addressbook_core::UserId;

use super::{PgStore, expect_one};
use crate::db::{RepositoryError, TokenStore};

#[async_trait]
impl TokenStore for PgStore {
    async fn insert_token(
        &self,
        token_hash: &str,
        user: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO auth_tokens (token_hash, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token_hash)
            .bind(user)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn user_for_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<UserId, RepositoryError> {
        let user_id: i64 = sqlx::query_scalar(
            "SELECT user_id FROM auth_tokens WHERE token_hash = $1 AND expires_at > $2",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(UserId::new(user_id))
    }

    async fn delete_token(&self, token_hash: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;

        expect_one(&result)
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
