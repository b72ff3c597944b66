//! User administration handlers.

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use addressbook_core::{Email, UserId};

use super::params::{IdQuery, required_text};
use crate::error::{AppError, Result};
use crate::middleware::CallerIdentity;
use crate::models::UserUpdate;
use crate::services::auth::{hash_password, validate_password};
use crate::state::AppState;

/// Body of `POST /users/create`.
#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Body of `PUT /users/update`. Omitting `password` keeps the current one.
#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// POST /users/create
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    payload: std::result::Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let caller = state.gate().authorize(identity, "create_users").await?;
    let Json(form) = payload?;

    let user = state
        .auth()
        .create_user(&form.username, &form.email, &form.password, Some(caller))
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /users/get?id=
pub async fn show(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<IdQuery<UserId>>, QueryRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "view_users").await?;
    let Query(IdQuery { id }) = query?;

    let user = state
        .store()
        .get_user(id)
        .await
        .map_err(|e| AppError::from_store(e, "user"))?;
    Ok(Json(user))
}

/// GET /users/list
pub async fn index(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "view_users").await?;
    Ok(Json(state.store().list_users().await?))
}

/// PUT /users/update
#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    payload: std::result::Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "edit_users").await?;
    let Json(form) = payload?;

    let password_hash = match form.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => {
            validate_password(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };
    let update = UserUpdate {
        username: required_text(&form.username, "username")?,
        email: Email::normalized(&form.email)
            .map_err(|e| AppError::Validation(e.to_string()))?,
        password_hash,
    };

    state
        .store()
        .update_user(form.id, &update)
        .await
        .map_err(|e| AppError::from_store(e, "user"))?;
    tracing::info!(user_id = %form.id, "User updated");

    let user = state
        .store()
        .get_user(form.id)
        .await
        .map_err(|e| AppError::from_store(e, "user"))?;
    Ok(Json(user))
}

/// DELETE /users/delete?id=
#[instrument(skip_all)]
pub async fn remove(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<IdQuery<UserId>>, QueryRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "delete_users").await?;
    let Query(IdQuery { id }) = query?;

    state
        .store()
        .delete_user(id)
        .await
        .map_err(|e| AppError::from_store(e, "user"))?;
    tracing::info!(user_id = %id, "User deleted");

    Ok(Json(json!({ "message": "User deleted successfully" })))
}
