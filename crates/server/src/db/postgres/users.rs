//! Users for the `PostgreSQL` backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use addressbook_core::{Email, UserId};

use super::{PgStore, expect_one};
use crate::db::{RepositoryError, UserStore, classify};
use crate::models::{NewUser, User, UserUpdate};

const USER_COLUMNS: &str = "id, username, email, created_at, created_by, last_login";

/// Internal row type for `PostgreSQL` user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    created_at: DateTime<Utc>,
    created_by: Option<i64>,
    last_login: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            username: row.username,
            email,
            created_at: row.created_at,
            created_by: row.created_by.map(UserId::new),
            last_login: row.last_login,
        })
    }
}

impl PgStore {
    async fn fetch_user(&self, filter: &str, bind: UserKey<'_>) -> Result<User, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter}");
        let query = sqlx::query_as::<_, UserRow>(&sql);
        let query = match bind {
            UserKey::Id(id) => query.bind(id),
            UserKey::Text(value) => query.bind(value),
        };
        query
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?
            .try_into()
    }
}

enum UserKey<'a> {
    Id(UserId),
    Text(&'a str),
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &NewUser) -> Result<UserId, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO users (username, email, hashed_password, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "username or email already exists"))?;

        Ok(UserId::new(id))
    }

    async fn get_user(&self, id: UserId) -> Result<User, RepositoryError> {
        self.fetch_user("id = $1", UserKey::Id(id)).await
    }

    async fn user_by_username(&self, username: &str) -> Result<User, RepositoryError> {
        self.fetch_user("username = $1", UserKey::Text(username))
            .await
    }

    async fn user_by_email(&self, email: &Email) -> Result<User, RepositoryError> {
        self.fetch_user("email = $1", UserKey::Text(email.as_str()))
            .await
    }

    async fn password_hash(&self, id: UserId) -> Result<String, RepositoryError> {
        sqlx::query_scalar("SELECT hashed_password FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_user(&self, id: UserId, update: &UserUpdate) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET username = $1,
                email = $2,
                hashed_password = COALESCE($3, hashed_password)
            WHERE id = $4
            ",
        )
        .bind(&update.username)
        .bind(&update.email)
        .bind(update.password_hash.as_deref())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, "username or email already exists"))?;

        expect_one(&result)
    }

    async fn delete_user(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_one(&result)
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id DESC");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn touch_last_login(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_one(&result)
    }
}
