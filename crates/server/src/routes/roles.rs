//! Role administration handlers.

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

use addressbook_core::RoleId;

use super::params::{IdQuery, required_text};
use crate::error::{AppError, Result};
use crate::middleware::CallerIdentity;
use crate::models::NewRole;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    #[serde(default)]
    pub id: Option<RoleId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl RoleRequest {
    fn to_new_role(&self) -> Result<NewRole> {
        Ok(NewRole {
            name: required_text(&self.name, "name")?,
            description: self.description.trim().to_owned(),
        })
    }
}

/// POST /roles/create
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    payload: std::result::Result<Json<RoleRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "create_roles").await?;
    let Json(form) = payload?;

    let id = state.store().insert_role(&form.to_new_role()?).await?;
    tracing::info!(role_id = %id, "Role created");

    let role = state
        .store()
        .get_role(id)
        .await
        .map_err(|e| AppError::from_store(e, "role"))?;
    Ok((StatusCode::CREATED, Json(role)))
}

/// GET /roles/get?id=
pub async fn show(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<IdQuery<RoleId>>, QueryRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "view_roles").await?;
    let Query(IdQuery { id }) = query?;

    let role = state
        .store()
        .get_role(id)
        .await
        .map_err(|e| AppError::from_store(e, "role"))?;
    Ok(Json(role))
}

/// GET /roles/list
pub async fn index(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "view_roles").await?;
    Ok(Json(state.store().list_roles().await?))
}

/// PUT /roles/update
#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    payload: std::result::Result<Json<RoleRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "edit_roles").await?;
    let Json(form) = payload?;
    let Some(id) = form.id else {
        return Err(AppError::Validation("id is required".to_owned()));
    };

    state
        .store()
        .update_role(id, &form.to_new_role()?)
        .await
        .map_err(|e| AppError::from_store(e, "role"))?;

    Ok(Json(json!({ "message": "Role updated successfully" })))
}

/// DELETE /roles/delete?id=
///
/// Assignments to users and permission grants go with the role.
#[instrument(skip_all)]
pub async fn remove(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<IdQuery<RoleId>>, QueryRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "delete_roles").await?;
    let Query(IdQuery { id }) = query?;

    state
        .store()
        .delete_role(id)
        .await
        .map_err(|e| AppError::from_store(e, "role"))?;
    tracing::info!(role_id = %id, "Role deleted");

    Ok(Json(json!({ "message": "Role deleted successfully" })))
}
