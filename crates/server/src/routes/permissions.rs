//! Permission administration handlers.

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

use addressbook_core::{PermissionId, PermissionName};

use super::params::IdQuery;
use crate::error::{AppError, Result};
use crate::middleware::CallerIdentity;
use crate::models::NewPermission;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PermissionRequest {
    #[serde(default)]
    pub id: Option<PermissionId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl PermissionRequest {
    fn to_new_permission(&self) -> Result<NewPermission> {
        let name =
            PermissionName::parse(&self.name).map_err(|e| AppError::Validation(e.to_string()))?;
        Ok(NewPermission {
            name,
            description: self.description.trim().to_owned(),
        })
    }
}

/// POST /permissions/create
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    payload: std::result::Result<Json<PermissionRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "create_permissions").await?;
    let Json(form) = payload?;

    let id = state
        .store()
        .insert_permission(&form.to_new_permission()?)
        .await?;
    tracing::info!(permission_id = %id, "Permission created");

    let permission = state
        .store()
        .get_permission(id)
        .await
        .map_err(|e| AppError::from_store(e, "permission"))?;
    Ok((StatusCode::CREATED, Json(permission)))
}

/// GET /permissions/get?id=
pub async fn show(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<IdQuery<PermissionId>>, QueryRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "view_permissions").await?;
    let Query(IdQuery { id }) = query?;

    let permission = state
        .store()
        .get_permission(id)
        .await
        .map_err(|e| AppError::from_store(e, "permission"))?;
    Ok(Json(permission))
}

/// GET /permissions/list
pub async fn index(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "view_permissions").await?;
    Ok(Json(state.store().list_permissions().await?))
}

/// PUT /permissions/update
#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    payload: std::result::Result<Json<PermissionRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "edit_permissions").await?;
    let Json(form) = payload?;
    let Some(id) = form.id else {
        return Err(AppError::Validation("id is required".to_owned()));
    };

    state
        .store()
        .update_permission(id, &form.to_new_permission()?)
        .await
        .map_err(|e| AppError::from_store(e, "permission"))?;

    Ok(Json(json!({ "message": "Permission updated successfully" })))
}

/// DELETE /permissions/delete?id=
#[instrument(skip_all)]
pub async fn remove(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<IdQuery<PermissionId>>, QueryRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "delete_permissions").await?;
    let Query(IdQuery { id }) = query?;

    state
        .store()
        .delete_permission(id)
        .await
        .map_err(|e| AppError::from_store(e, "permission"))?;
    tracing::info!(permission_id = %id, "Permission deleted");

    Ok(Json(json!({ "message": "Permission deleted successfully" })))
}
