//! User↔role and role↔permission junction handlers.
//!
//! `not_found` on assign means one side of the pair is missing; on remove
//! it means the pair itself is.

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

use addressbook_core::{PermissionId, RoleId, UserId};

use super::params::require_positive;
use crate::error::{AppError, Result};
use crate::middleware::CallerIdentity;
use crate::state::AppState;

/// A user↔role pair, as a body (`assign`) or query (`remove`).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UserRolePair {
    pub user_id: UserId,
    pub role_id: RoleId,
}

/// A role↔permission pair, as a body (`assign`) or query (`remove`).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RolePermissionPair {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct RoleQuery {
    pub role_id: RoleId,
}

/// POST /user_roles/assign
#[instrument(skip_all)]
pub async fn assign_role(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    payload: std::result::Result<Json<UserRolePair>, JsonRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "assign_roles").await?;
    let Json(pair) = payload?;
    require_positive(pair.user_id.as_i64(), "user_id")?;
    require_positive(pair.role_id.as_i64(), "role_id")?;

    state
        .relationships()
        .assign(pair.user_id, pair.role_id)
        .await
        .map_err(|e| AppError::from_store(e, "user or role"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Role assigned to user successfully" })),
    ))
}

/// DELETE /user_roles/remove?user_id=&role_id=
#[instrument(skip_all)]
pub async fn remove_role(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<UserRolePair>, QueryRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "unassign_roles").await?;
    let Query(pair) = query?;

    state
        .relationships()
        .unassign(pair.user_id, pair.role_id)
        .await
        .map_err(|e| AppError::from_store(e, "role assignment"))?;

    Ok(Json(json!({ "message": "Role removed from user successfully" })))
}

/// GET /user_roles/list?user_id=
pub async fn roles_of_user(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<UserQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "view_roles").await?;
    let Query(UserQuery { user_id }) = query?;

    state
        .store()
        .get_user(user_id)
        .await
        .map_err(|e| AppError::from_store(e, "user"))?;
    Ok(Json(state.store().roles_for_user(user_id).await?))
}

/// POST /role_permissions/assign
#[instrument(skip_all)]
pub async fn assign_permission(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    payload: std::result::Result<Json<RolePermissionPair>, JsonRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "assign_permissions").await?;
    let Json(pair) = payload?;
    require_positive(pair.role_id.as_i64(), "role_id")?;
    require_positive(pair.permission_id.as_i64(), "permission_id")?;

    state
        .relationships()
        .assign_permission(pair.role_id, pair.permission_id)
        .await
        .map_err(|e| AppError::from_store(e, "role or permission"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Permission assigned to role successfully" })),
    ))
}

/// DELETE /role_permissions/remove?role_id=&permission_id=
#[instrument(skip_all)]
pub async fn remove_permission(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<RolePermissionPair>, QueryRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "unassign_permissions").await?;
    let Query(pair) = query?;

    state
        .relationships()
        .unassign_permission(pair.role_id, pair.permission_id)
        .await
        .map_err(|e| AppError::from_store(e, "permission grant"))?;

    Ok(Json(json!({ "message": "Permission removed from role successfully" })))
}

/// GET /role_permissions/list?role_id=
pub async fn permissions_of_role(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<RoleQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "view_permissions").await?;
    let Query(RoleQuery { role_id }) = query?;

    state
        .store()
        .get_role(role_id)
        .await
        .map_err(|e| AppError::from_store(e, "role"))?;
    Ok(Json(state.store().permissions_for_role(role_id).await?))
}
