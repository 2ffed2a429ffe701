//! Owner recipient commands.

use gift_registry_core::RecipientList;
use gift_registry_server::db::config::{load_recipients, save_recipients};

use super::{CliError, connect};

/// Replace the recipient list with a normalized `emails`.
///
/// # Errors
///
/// Returns an error if the database write fails.
pub async fn set(emails: &str) -> Result<(), CliError> {
    let recipients = RecipientList::parse(emails);
    let store = connect().await?;
    save_recipients(&store, &recipients).await?;
    tracing::info!("Recipients set to: {recipients}");
    Ok(())
}

/// Print the stored recipient list.
///
/// # Errors
///
/// Returns an error if the database read fails.
pub async fn show() -> Result<(), CliError> {
    let store = connect().await?;
    let recipients = load_recipients(&store).await?;
    if recipients.is_empty() {
        tracing::warn!("No recipients configured; the server will use RECIPIENTS_TO");
    }

    #[allow(clippy::print_stdout)]
    {
        println!("{recipients}");
    }
    Ok(())
}
