//! Admin recipient configuration.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use gift_registry_core::RecipientList;

use crate::db::config::save_recipients as store_recipients;
use crate::error::Result;
use crate::extract::ApiJson;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Recipient update body: a raw comma-separated list.
#[derive(Debug, Deserialize)]
pub struct RecipientsBody {
    #[serde(default)]
    pub emails: String,
}

/// Recipient update response with the normalized list.
#[derive(Debug, Serialize)]
pub struct RecipientsSaved {
    pub ok: bool,
    pub emails: String,
}

/// Normalize and store the owner recipient list.
///
/// Entries are not checked for email syntax; a bad entry shows up as a
/// failed owner notification.
#[instrument(skip_all)]
pub async fn save_recipients(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RecipientsBody>,
) -> Result<Json<RecipientsSaved>> {
    let recipients = RecipientList::parse(&body.emails);
    store_recipients(state.store(), &recipients).await?;
    tracing::info!(count = recipients.len(), "Owner recipients updated");

    Ok(Json(RecipientsSaved {
        ok: true,
        emails: recipients.render(),
    }))
}
