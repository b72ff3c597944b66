//! `ab-cli schema`

use super::{CommandError, connect};

/// Create every table that does not exist yet.
///
/// # Errors
///
/// Returns `CommandError` if the store cannot be opened or DDL fails.
pub async fn run() -> Result<(), CommandError> {
    let (_, store) = connect().await?;
    store.setup_schema().await?;

    tracing::info!("Schema is up to date");
    Ok(())
}
