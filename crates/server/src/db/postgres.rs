//! `PostgreSQL` implementation of [`RegistryStore`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use gift_registry_core::{Item, ItemId, NewItem};

use super::{ITEMS_CHANNEL, ItemChange, RegistryStore, RepositoryError, change_channel};

/// Delay before polling again after the listener connection drops.
const LISTENER_RETRY_DELAY: Duration = Duration::from_secs(1);

const ITEM_COLUMNS: &str = "id, name, url, price, size, notes, claimed_at, created_at";

/// Registry store backed by the `registry` schema.
#[derive(Clone)]
pub struct PgRegistryStore {
    pool: PgPool,
    changes: broadcast::Sender<ItemChange>,
}

impl PgRegistryStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            changes: change_channel(),
        }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Start forwarding `items_changed` notifications to subscribers.
    ///
    /// The listener reconnects on its own; notifications sent while it is
    /// disconnected are lost, so a reconnect is reported as `ItemChange::Other`
    /// to make subscribers refetch.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial `LISTEN` fails.
    pub async fn spawn_listener(&self) -> Result<JoinHandle<()>, RepositoryError> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(ITEMS_CHANNEL).await?;
        let changes = self.changes.clone();

        Ok(tokio::spawn(async move {
            loop {
                match listener.try_recv().await {
                    Ok(Some(notification)) => {
                        let change = ItemChange::from_payload(notification.payload());
                        tracing::debug!(?change, "Item change notification");
                        // No receivers is fine: nobody is watching.
                        let _ = changes.send(change);
                    }
                    Ok(None) => {
                        tracing::warn!("Item change listener reconnected");
                        let _ = changes.send(ItemChange::Other);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Item change listener failed");
                        tokio::time::sleep(LISTENER_RETRY_DELAY).await;
                    }
                }
            }
        }))
    }
}

#[async_trait]
impl RegistryStore for PgRegistryStore {
    async fn list_items(&self) -> Result<Vec<Item>, RepositoryError> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM registry.items ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM registry.items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn insert_item(&self, item: &NewItem) -> Result<Item, RepositoryError> {
        let row = sqlx::query_as::<_, Item>(&format!(
            r"
            INSERT INTO registry.items (name, url, price, size, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ITEM_COLUMNS}
            "
        ))
        .bind(&item.name)
        .bind(item.url.as_deref())
        .bind(item.price.as_deref())
        .bind(item.size.as_deref())
        .bind(item.notes.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM registry.items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn claim_item(
        &self,
        id: ItemId,
        at: DateTime<Utc>,
    ) -> Result<Option<Item>, RepositoryError> {
        let item = sqlx::query_as::<_, Item>(&format!(
            r"
            UPDATE registry.items
            SET claimed_at = $2
            WHERE id = $1 AND claimed_at IS NULL
            RETURNING {ITEM_COLUMNS}
            "
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn release_claim(
        &self,
        id: ItemId,
        claimed_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE registry.items
            SET claimed_at = NULL
            WHERE id = $1 AND claimed_at = $2
            ",
        )
        .bind(id)
        .bind(claimed_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_config(&self, key: &str) -> Result<Option<JsonValue>, RepositoryError> {
        let value = sqlx::query_scalar::<_, JsonValue>(
            "SELECT value FROM registry.config WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn upsert_config(&self, key: &str, value: &JsonValue) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO registry.config (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ItemChange> {
        self.changes.subscribe()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
