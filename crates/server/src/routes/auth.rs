//! Authentication route handlers.
//!
//! Register and login are open; logout needs the token being revoked.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::BearerToken;
use crate::state::AppState;

/// Registration form.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login form. The identifier is a username, or an email if it contains `@`.
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "username", alias = "email")]
    pub identifier: String,
    pub password: String,
}

/// POST /auth/register
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(form) = payload?;
    let user = state
        .auth()
        .register(&form.username, &form.email, &form.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful",
            "id": user.id,
            "username": user.username,
            "email": user.email,
        })),
    ))
}

/// POST /auth/login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(form) = payload?;
    let (user, issued) = state.auth().login(&form.identifier, &form.password).await?;

    Ok(Json(json!({
        "token": issued.token,
        "expires_at": issued.expires_at,
        "user": user,
    })))
}

/// POST /auth/logout
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<impl IntoResponse> {
    let Some(token) = token else {
        return Err(AppError::Unauthorized("authentication required".to_owned()));
    };
    state.auth().logout(&token).await?;

    Ok(Json(json!({ "message": "Logged out" })))
}
