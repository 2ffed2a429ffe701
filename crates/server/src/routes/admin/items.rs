//! Admin item management.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use gift_registry_core::{Item, NewItem};

use super::Ack;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, RawItemId, require_item_id};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// New item body. The name may also be sent as `item`.
#[derive(Debug, Deserialize)]
pub struct CreateItemBody {
    #[serde(alias = "item")]
    pub name: Option<String>,
    pub url: Option<String>,
    pub price: Option<String>,
    pub size: Option<String>,
    pub notes: Option<String>,
}

/// Delete body.
#[derive(Debug, Deserialize)]
pub struct DeleteItemBody {
    pub id: Option<RawItemId>,
}

/// Create an item and return the stored row.
#[instrument(skip_all)]
pub async fn create_item(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateItemBody>,
) -> Result<Json<Item>> {
    let new_item = NewItem::new(body.name.as_deref().unwrap_or_default())
        .map_err(|e| AppError::BadRequest(e.to_string()))?
        .with_url(body.url.as_deref())
        .with_price(body.price.as_deref())
        .with_size(body.size.as_deref())
        .with_notes(body.notes.as_deref());

    let item = state.store().insert_item(&new_item).await?;
    tracing::info!(item_id = %item.id, name = %item.name, "Item created");
    Ok(Json(item))
}

/// Delete an item. Deleting an unknown ID is still acknowledged.
#[instrument(skip_all)]
pub async fn delete_item(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<DeleteItemBody>,
) -> Result<Json<Ack>> {
    let id = require_item_id(body.id.as_ref())?;
    let removed = state.store().delete_item(id).await?;
    tracing::info!(item_id = %id, removed, "Item delete requested");
    Ok(Json(Ack { ok: true }))
}
