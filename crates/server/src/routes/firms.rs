//! Firm handlers.

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

use addressbook_core::{ContactId, FirmId};

use super::params::{IdQuery, require_fields};
use crate::error::{AppError, Result};
use crate::middleware::CallerIdentity;
use crate::models::FirmFields;
use crate::state::AppState;

/// Body of `POST /firm/submit`: the firm plus the contacts to link.
#[derive(Debug, Deserialize)]
pub struct SubmitFirm {
    #[serde(flatten)]
    pub firm: FirmFields,
    #[serde(default)]
    pub contact_ids: Vec<ContactId>,
    /// Single-contact form still sent by older frontends.
    #[serde(default)]
    pub contact_id: Option<ContactId>,
}

impl SubmitFirm {
    /// `contact_ids` wins; a positive `contact_id` is used only without it.
    fn links(&self) -> Vec<ContactId> {
        if self.contact_ids.is_empty() {
            self.contact_id
                .into_iter()
                .filter(|id| id.as_i64() > 0)
                .collect()
        } else {
            self.contact_ids.clone()
        }
    }
}

/// Body of `PUT /firm/update`.
#[derive(Debug, Deserialize)]
pub struct UpdateFirm {
    pub id: FirmId,
    #[serde(flatten)]
    pub firm: FirmFields,
}

#[derive(Debug, Deserialize)]
pub struct ContactQuery {
    pub contact_id: ContactId,
}

/// POST /firm/submit
///
/// The firm and every contact link are written in one transaction.
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    payload: std::result::Result<Json<SubmitFirm>, JsonRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "create_firms").await?;
    let Json(body) = payload?;
    require_fields(&body.firm.missing_required())?;

    let contact_ids = body.links();
    let firm_id = state
        .relationships()
        .insert_firm_with_contacts(&body.firm, &contact_ids)
        .await
        .map_err(|e| AppError::from_store(e, "firm"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Firm successfully registered",
            "firm_id": firm_id,
            "contact_ids": contact_ids,
        })),
    ))
}

/// GET /firm/get
pub async fn index(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "view_firms").await?;
    let firms = state.store().list_firms().await?;

    Ok(Json(json!({ "count": firms.len(), "firms": firms })))
}

/// GET /firm/get_by_id?id=
pub async fn show(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<IdQuery<FirmId>>, QueryRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "view_firms").await?;
    let Query(IdQuery { id }) = query?;

    let firm = state
        .store()
        .get_firm(id)
        .await
        .map_err(|e| AppError::from_store(e, "firm"))?;
    Ok(Json(firm))
}

/// GET /firm/by_contact?contact_id=
pub async fn by_contact(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<ContactQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "view_firms").await?;
    let Query(ContactQuery { contact_id }) = query?;

    state
        .store()
        .get_contact(contact_id)
        .await
        .map_err(|e| AppError::from_store(e, "contact"))?;
    let firms = state.store().firms_for_contact(contact_id).await?;

    Ok(Json(json!({
        "contact_id": contact_id,
        "count": firms.len(),
        "firms": firms,
    })))
}

/// PUT /firm/update
#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    payload: std::result::Result<Json<UpdateFirm>, JsonRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "edit_firms").await?;
    let Json(body) = payload?;
    require_fields(&body.firm.missing_required())?;

    state
        .store()
        .update_firm(body.id, &body.firm)
        .await
        .map_err(|e| AppError::from_store(e, "firm"))?;
    tracing::info!(firm_id = %body.id, "Firm updated");

    Ok(Json(json!({ "message": "Firm updated successfully" })))
}

/// DELETE /firm/delete?id=
#[instrument(skip_all)]
pub async fn remove(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<IdQuery<FirmId>>, QueryRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "delete_firms").await?;
    let Query(IdQuery { id }) = query?;

    state
        .store()
        .delete_firm(id)
        .await
        .map_err(|e| AppError::from_store(e, "firm"))?;
    tracing::info!(firm_id = %id, "Firm deleted");

    Ok(Json(json!({ "message": "Firm deleted successfully" })))
}
