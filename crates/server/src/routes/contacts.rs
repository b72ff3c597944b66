//! Contact handlers, mirroring the firm side.

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
use crate::models::ContactFields;
use crate::state::AppState;

/// Body of `POST /contact/submit`: the contact plus the firms it belongs to.
#[derive(Debug, Deserialize)]
pub struct SubmitContact {
    #[serde(flatten)]
    pub contact: ContactFields,
    #[serde(default, alias = "firm_ids")]
    pub firms: Vec<FirmId>,
}

/// Body of `PUT /contact/update`.
#[derive(Debug, Deserialize)]
pub struct UpdateContact {
    pub id: ContactId,
    #[serde(flatten)]
    pub contact: ContactFields,
}

#[derive(Debug, Deserialize)]
pub struct FirmQuery {
    pub firm_id: FirmId,
}

/// POST /contact/submit
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    payload: std::result::Result<Json<SubmitContact>, JsonRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "create_contacts").await?;
    let Json(body) = payload?;
    require_fields(&body.contact.missing_required())?;

    let contact_id = state
        .relationships()
        .insert_contact_with_firms(&body.contact, &body.firms)
        .await
        .map_err(|e| AppError::from_store(e, "contact"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Contact successfully registered",
            "contact_id": contact_id,
            "firm_ids": body.firms,
        })),
    ))
}

/// GET /contact/get
pub async fn index(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "view_contacts").await?;
    let contacts = state.store().list_contacts().await?;

    Ok(Json(json!({ "count": contacts.len(), "contacts": contacts })))
}

/// GET /contact/get_by_id?id=
pub async fn show(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<IdQuery<ContactId>>, QueryRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "view_contacts").await?;
    let Query(IdQuery { id }) = query?;

    let contact = state
        .store()
        .get_contact(id)
        .await
        .map_err(|e| AppError::from_store(e, "contact"))?;
    Ok(Json(contact))
}

/// GET /contact/by_firm?firm_id=
pub async fn by_firm(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<FirmQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "view_contacts").await?;
    let Query(FirmQuery { firm_id }) = query?;

    state
        .store()
        .get_firm(firm_id)
        .await
        .map_err(|e| AppError::from_store(e, "firm"))?;
    let contacts = state.store().contacts_for_firm(firm_id).await?;

    Ok(Json(json!({
        "firm_id": firm_id,
        "count": contacts.len(),
        "contacts": contacts,
    })))
}

/// PUT /contact/update
#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    payload: std::result::Result<Json<UpdateContact>, JsonRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "edit_contacts").await?;
    let Json(body) = payload?;
    require_fields(&body.contact.missing_required())?;

    state
        .store()
        .update_contact(body.id, &body.contact)
        .await
        .map_err(|e| AppError::from_store(e, "contact"))?;
    tracing::info!(contact_id = %body.id, "Contact updated");

    Ok(Json(json!({ "message": "Contact updated successfully" })))
}

/// DELETE /contact/delete?id=
#[instrument(skip_all)]
pub async fn remove(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<IdQuery<ContactId>>, QueryRejection>,
) -> Result<impl IntoResponse> {
    state.gate().authorize(identity, "delete_contacts").await?;
    let Query(IdQuery { id }) = query?;

    state
        .store()
        .delete_contact(id)
        .await
        .map_err(|e| AppError::from_store(e, "contact"))?;
    tracing::info!(contact_id = %id, "Contact deleted");

    Ok(Json(json!({ "message": "Contact deleted successfully" })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_submit_accepts_both_firm_list_names() {
        let body: SubmitContact =
            serde_json::from_value(json!({"vorname": "Eva", "email": "eva@x.de", "firms": [1, 2]}))
                .unwrap();
        assert_eq!(body.firms, vec![FirmId::new(1), FirmId::new(2)]);

        let body: SubmitContact =
            serde_json::from_value(json!({"vorname": "Eva", "firm_ids": [7]})).unwrap();
        assert_eq!(body.firms, vec![FirmId::new(7)]);
        assert_eq!(body.contact.first_name, "Eva");
    }

    #[test]
    fn test_bad_birthdate_fails_to_parse() {
        let result: std::result::Result<SubmitContact, _> =
            serde_json::from_value(json!({"vorname": "Eva", "geburtstag": "1.4.1990"}));
        assert!(result.is_err());
    }
}
