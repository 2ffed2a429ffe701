//! Public claim endpoint.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use gift_registry_core::Email;

use crate::error::{AppError, Result};
use crate::extract::{ApiJson, RawItemId, require_item_id};
use crate::services::claim::{ClaimRequest, claim_item};
use crate::state::AppState;

/// Claim request body.
#[derive(Debug, Deserialize)]
pub struct ClaimBody {
    pub id: Option<RawItemId>,
    pub email: Option<String>,
}

/// Successful claim response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub ok: bool,
    /// Display name of the claimed item.
    pub item: String,
    pub email_sent: bool,
    pub owners_notified: bool,
}

/// Reserve an item for the donor and send the confirmation emails.
///
/// Input is validated before anything is written.
#[instrument(skip_all)]
pub async fn claim(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ClaimBody>,
) -> Result<Json<ClaimResponse>> {
    let item_id = require_item_id(body.id.as_ref())?;
    let donor = body
        .email
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Missing email".to_string()))
        .and_then(|raw| Email::parse(raw).map_err(AppError::from))?;

    let outcome = claim_item(
        state.store(),
        state.notifier(),
        &state.config().email.fallback_recipients,
        ClaimRequest { item_id, donor },
    )
    .await?;

    Ok(Json(ClaimResponse {
        ok: true,
        item: outcome.item.name,
        email_sent: outcome.email_sent,
        owners_notified: outcome.owners_notified,
    }))
}
