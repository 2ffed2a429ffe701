//! Public read API and live item stream.

use std::convert::Infallible;

use axum::{
    Json,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::instrument;

use gift_registry_core::ListedItem;

use crate::db::config::load_recipients;
use crate::error::Result;
use crate::state::AppState;

/// SSE event name carrying the full item list.
pub const ITEMS_EVENT: &str = "items";

/// Recipient list response.
#[derive(Debug, Serialize)]
pub struct RecipientsResponse {
    pub emails: String,
}

/// All items, newest first.
#[instrument(skip_all)]
pub async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<ListedItem>>> {
    let items = state.store().list_items().await?;
    Ok(Json(items.into_iter().map(ListedItem::from).collect()))
}

/// The configured owner recipients as a normalized string.
#[instrument(skip_all)]
pub async fn recipients(State(state): State<AppState>) -> Result<Json<RecipientsResponse>> {
    let list = load_recipients(state.store()).await?;
    Ok(Json(RecipientsResponse {
        emails: list.render(),
    }))
}

/// Stream the item list: once on connect, then again after every change.
///
/// Subscribers that fall behind skip the missed notifications and simply
/// refetch, since every event carries the full list.
pub async fn stream_items(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    // Subscribe before the first fetch so no change slips in between.
    let mut changes = state.store().subscribe();

    let stream = async_stream::stream! {
        if let Some(event) = items_event(&state).await {
            yield Ok::<_, Infallible>(event);
        }
        loop {
            match changes.recv().await {
                Ok(change) => tracing::debug!(?change, "Pushing item list"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Item stream lagged; refetching");
                }
                Err(RecvError::Closed) => break,
            }
            if let Some(event) = items_event(&state).await {
                yield Ok::<_, Infallible>(event);
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn items_event(state: &AppState) -> Option<Event> {
    let items: Vec<ListedItem> = match state.store().list_items().await {
        Ok(items) => items.into_iter().map(ListedItem::from).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load items for stream");
            return None;
        }
    };
    Event::default()
        .event(ITEMS_EVENT)
        .json_data(&items)
        .map_err(|e| tracing::error!(error = %e, "Failed to serialize items"))
        .ok()
}
