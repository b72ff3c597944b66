//! The caller's own view of their access.

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::error::Result;
use crate::middleware::CallerIdentity;
use crate::services::require_identity;
use crate::state::AppState;

/// GET /me/permissions
///
/// Effective permissions, sorted, read fresh on every call.
pub async fn permissions(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
) -> Result<impl IntoResponse> {
    let user = require_identity(identity)?;
    let permissions = state.resolver().permissions_for_user(user).await?;

    Ok(Json(json!({
        "user_id": user,
        "permissions": permissions,
    })))
}
