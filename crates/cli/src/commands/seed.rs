//! `ab-cli seed`
//!
//! Same idempotent seed the server runs on start; useful after restoring a
//! dump or wiping the RBAC tables.

use addressbook_server::services::seed;

use super::{CommandError, connect};

/// # Errors
///
/// Returns `CommandError` if the store cannot be opened or the seed fails.
pub async fn run() -> Result<(), CommandError> {
    let (config, store) = connect().await?;
    store.setup_schema().await?;

    let report = seed::run(store.as_ref(), &config.bootstrap_admin).await?;
    tracing::info!(
        permissions_created = report.permissions_created,
        role_created = report.role_created,
        admin_created = report.admin_created,
        permission_grants_created = report.permission_grants_created,
        admin_role_assigned = report.admin_role_assigned,
        "Seed complete"
    );
    Ok(())
}
