//! Registry store: items and key-value config.
//!
//! # Database: `registry` schema
//!
//! ## Tables
//!
//! - `items` - Gift entries; `claimed_at IS NULL` means the item is open
//! - `config` - Key-value settings (`recipients` holds the owner list)
//!
//! A trigger on `items` publishes every change on the [`ITEMS_CHANNEL`]
//! notification channel so connected pages can refresh.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p gift-registry-cli -- migrate
//! ```

pub mod config;
pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::broadcast;

use gift_registry_core::{Item, ItemId, NewItem};

pub use memory::MemoryStore;
pub use postgres::PgRegistryStore;

/// Notification channel fed by the `items` table trigger.
pub const ITEMS_CHANNEL: &str = "items_changed";

/// Capacity of the in-process change broadcast.
const CHANGE_BUFFER: usize = 64;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A change to the `items` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "UPPERCASE")]
pub enum ItemChange {
    Insert { id: ItemId },
    Update { id: ItemId },
    Delete { id: ItemId },
    /// A change whose payload could not be interpreted.
    #[serde(other)]
    Other,
}

impl ItemChange {
    /// Parse a notification payload such as `{"op":"UPDATE","id":3}`.
    #[must_use]
    pub fn from_payload(payload: &str) -> Self {
        serde_json::from_str(payload).unwrap_or_else(|e| {
            tracing::warn!(error = %e, payload, "Unrecognized item change payload");
            Self::Other
        })
    }
}

/// Create the broadcast channel used to fan out item changes.
pub(crate) fn change_channel() -> broadcast::Sender<ItemChange> {
    broadcast::channel(CHANGE_BUFFER).0
}

/// Storage operations needed by the registry.
///
/// The only concurrency primitive is [`RegistryStore::claim_item`]: a
/// conditional single-row update that succeeds for at most one caller.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// All items, newest first.
    async fn list_items(&self) -> Result<Vec<Item>, RepositoryError>;

    /// A single item by ID.
    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, RepositoryError>;

    /// Insert a new open item and return the stored row.
    async fn insert_item(&self, item: &NewItem) -> Result<Item, RepositoryError>;

    /// Delete an item. Returns whether a row was removed.
    async fn delete_item(&self, id: ItemId) -> Result<bool, RepositoryError>;

    /// Set `claimed_at` to `at` only if the item exists and is still open.
    ///
    /// Returns the updated row, or `None` if the item was missing or already
    /// claimed.
    async fn claim_item(
        &self,
        id: ItemId,
        at: DateTime<Utc>,
    ) -> Result<Option<Item>, RepositoryError>;

    /// Clear `claimed_at`, but only if it still equals `claimed_at`.
    ///
    /// Compensates a claim whose confirmation could not be sent. Returns
    /// whether the row was reopened.
    async fn release_claim(
        &self,
        id: ItemId,
        claimed_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// Read a config value.
    async fn get_config(&self, key: &str) -> Result<Option<JsonValue>, RepositoryError>;

    /// Insert or overwrite a config value.
    async fn upsert_config(&self, key: &str, value: &JsonValue) -> Result<(), RepositoryError>;

    /// Subscribe to item changes.
    fn subscribe(&self) -> broadcast::Receiver<ItemChange>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_change_from_payload() {
        assert_eq!(
            ItemChange::from_payload(r#"{"op":"UPDATE","id":3}"#),
            ItemChange::Update {
                id: ItemId::new(3)
            }
        );
        assert_eq!(
            ItemChange::from_payload(r#"{"op":"DELETE","id":9}"#),
            ItemChange::Delete {
                id: ItemId::new(9)
            }
        );
    }

    #[test]
    fn test_item_change_unknown_payload() {
        assert_eq!(ItemChange::from_payload("not json"), ItemChange::Other);
        assert_eq!(
            ItemChange::from_payload(r#"{"op":"TRUNCATE"}"#),
            ItemChange::Other
        );
    }
}
