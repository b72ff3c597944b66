//! Device catalog handlers.
//!
//! The catalog sits outside RBAC: any authenticated caller may read and
//! edit it.

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

use addressbook_core::{DeviceId, DeviceLinkId};

use super::params::{IdQuery, require_positive};
use crate::error::{AppError, Result};
use crate::middleware::CallerIdentity;
use crate::models::{DeviceFields, DeviceLinkFields};
use crate::services::require_identity;
use crate::state::AppState;

/// Body of `PUT /devices/update`.
#[derive(Debug, Deserialize)]
pub struct UpdateDevice {
    #[serde(rename = "ID")]
    pub id: DeviceId,
    #[serde(flatten)]
    pub device: DeviceFields,
}

/// Body of `PUT /device_links/update`.
#[derive(Debug, Deserialize)]
pub struct UpdateDeviceLink {
    pub id: DeviceLinkId,
    #[serde(flatten)]
    pub link: DeviceLinkFields,
}

#[derive(Debug, Deserialize)]
pub struct DeviceQuery {
    pub device_id: DeviceId,
}

fn validate_device(device: &DeviceFields) -> Result<()> {
    if device.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_owned()));
    }
    Ok(())
}

fn validate_link(link: &DeviceLinkFields) -> Result<()> {
    require_positive(link.from_device_id.as_i64(), "from_device_id")?;
    require_positive(link.to_device_id.as_i64(), "to_device_id")?;
    if link.from_device_id == link.to_device_id {
        return Err(AppError::Validation(
            "a device cannot link to itself".to_owned(),
        ));
    }
    Ok(())
}

/// POST /devices/create
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    payload: std::result::Result<Json<DeviceFields>, JsonRejection>,
) -> Result<impl IntoResponse> {
    require_identity(identity)?;
    let Json(device) = payload?;
    validate_device(&device)?;

    let id = state.store().insert_device(&device).await?;
    tracing::info!(device_id = %id, "Device created");

    let device = state
        .store()
        .get_device(id)
        .await
        .map_err(|e| AppError::from_store(e, "device"))?;
    Ok((StatusCode::CREATED, Json(device)))
}

/// GET /devices/get?id=
pub async fn show(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<IdQuery<DeviceId>>, QueryRejection>,
) -> Result<impl IntoResponse> {
    require_identity(identity)?;
    let Query(IdQuery { id }) = query?;

    let device = state
        .store()
        .get_device(id)
        .await
        .map_err(|e| AppError::from_store(e, "device"))?;
    Ok(Json(device))
}

/// GET /devices/list
pub async fn index(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
) -> Result<impl IntoResponse> {
    require_identity(identity)?;
    Ok(Json(state.store().list_devices().await?))
}

/// PUT /devices/update
#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    payload: std::result::Result<Json<UpdateDevice>, JsonRejection>,
) -> Result<impl IntoResponse> {
    require_identity(identity)?;
    let Json(body) = payload?;
    validate_device(&body.device)?;

    state
        .store()
        .update_device(body.id, &body.device)
        .await
        .map_err(|e| AppError::from_store(e, "device"))?;

    Ok(Json(json!({ "message": "Device updated successfully" })))
}

/// DELETE /devices/delete?id=
///
/// Links from or to the device are removed with it.
#[instrument(skip_all)]
pub async fn remove(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<IdQuery<DeviceId>>, QueryRejection>,
) -> Result<impl IntoResponse> {
    require_identity(identity)?;
    let Query(IdQuery { id }) = query?;

    state
        .store()
        .delete_device(id)
        .await
        .map_err(|e| AppError::from_store(e, "device"))?;
    tracing::info!(device_id = %id, "Device deleted");

    Ok(Json(json!({ "message": "Device deleted successfully" })))
}

/// POST /device_links/create
#[instrument(skip_all)]
pub async fn create_link(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    payload: std::result::Result<Json<DeviceLinkFields>, JsonRejection>,
) -> Result<impl IntoResponse> {
    require_identity(identity)?;
    let Json(link) = payload?;
    validate_link(&link)?;

    let id = state
        .store()
        .insert_device_link(&link)
        .await
        .map_err(|e| AppError::from_store(e, "device"))?;

    let link = state
        .store()
        .get_device_link(id)
        .await
        .map_err(|e| AppError::from_store(e, "device link"))?;
    Ok((StatusCode::CREATED, Json(link)))
}

/// GET /device_links/get?device_id=
///
/// Links leaving the given device.
pub async fn links_from(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<DeviceQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    require_identity(identity)?;
    let Query(DeviceQuery { device_id }) = query?;

    Ok(Json(state.store().links_from_device(device_id).await?))
}

/// GET /device_links/list
pub async fn link_index(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
) -> Result<impl IntoResponse> {
    require_identity(identity)?;
    Ok(Json(state.store().list_device_links().await?))
}

/// PUT /device_links/update
#[instrument(skip_all)]
pub async fn update_link(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    payload: std::result::Result<Json<UpdateDeviceLink>, JsonRejection>,
) -> Result<impl IntoResponse> {
    require_identity(identity)?;
    let Json(body) = payload?;
    validate_link(&body.link)?;

    state
        .store()
        .update_device_link(body.id, &body.link)
        .await
        .map_err(|e| AppError::from_store(e, "device link"))?;

    Ok(Json(json!({ "message": "Device link updated successfully" })))
}

/// DELETE /device_links/delete?id=
#[instrument(skip_all)]
pub async fn remove_link(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    query: std::result::Result<Query<IdQuery<DeviceLinkId>>, QueryRejection>,
) -> Result<impl IntoResponse> {
    require_identity(identity)?;
    let Query(IdQuery { id }) = query?;

    state
        .store()
        .delete_device_link(id)
        .await
        .map_err(|e| AppError::from_store(e, "device link"))?;

    Ok(Json(json!({ "message": "Link deleted successfully" })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn link(from: i64, to: i64) -> DeviceLinkFields {
        DeviceLinkFields {
            from_device_id: DeviceId::new(from),
            to_device_id: DeviceId::new(to),
        }
    }

    #[test]
    fn test_link_validation() {
        assert!(validate_link(&link(1, 2)).is_ok());
        assert!(matches!(validate_link(&link(0, 2)), Err(AppError::Validation(_))));
        assert!(matches!(validate_link(&link(3, -1)), Err(AppError::Validation(_))));
        assert!(matches!(validate_link(&link(4, 4)), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_device_requires_name() {
        assert!(validate_device(&DeviceFields::default()).is_err());
        let named = DeviceFields {
            name: "nas-01".to_owned(),
            ..DeviceFields::default()
        };
        assert!(validate_device(&named).is_ok());
    }

    #[test]
    fn test_update_body_reads_inventory_id_key() {
        let body: UpdateDevice =
            serde_json::from_value(serde_json::json!({"ID": 12, "Name": "fw-02"})).unwrap();
        assert_eq!(body.id, DeviceId::new(12));
        assert_eq!(body.device.name, "fw-02");
    }
}
