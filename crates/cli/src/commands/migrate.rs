//! Database migration command.
//!
//! Applies the migrations in `crates/server/migrations/`, which create the
//! `registry` schema, its tables and the change-notification trigger.

use super::{CliError, connect};

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let store = connect().await?;

    tracing::info!("Running registry migrations...");
    sqlx::migrate!("../server/migrations")
        .run(store.pool())
        .await?;

    tracing::info!("Registry migrations complete!");
    Ok(())
}
