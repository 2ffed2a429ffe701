//! In-memory [`RegistryStore`] for tests and local development.
//!
//! All state sits behind one async mutex, so the conditional claim behaves
//! like the `claimed_at IS NULL` guarded update in `PostgreSQL`.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tokio::sync::{Mutex, broadcast};

use gift_registry_core::{Item, ItemId, NewItem};

use super::{ItemChange, RegistryStore, RepositoryError, change_channel};

#[derive(Default)]
struct MemoryState {
    items: BTreeMap<ItemId, Item>,
    config: HashMap<String, JsonValue>,
    next_id: i64,
}

/// Registry store holding everything in process memory.
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    changes: broadcast::Sender<ItemChange>,
    unavailable: AtomicBool,
    fail_releases: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                next_id: 1,
                ..MemoryState::default()
            }),
            changes: change_channel(),
            unavailable: AtomicBool::new(false),
            fail_releases: AtomicBool::new(false),
        }
    }

    /// Make every operation fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make only [`RegistryStore::release_claim`] fail.
    pub fn set_fail_releases(&self, fail: bool) {
        self.fail_releases.store(fail, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn publish(&self, change: ItemChange) {
        let _ = self.changes.send(change);
    }
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn list_items(&self) -> Result<Vec<Item>, RepositoryError> {
        self.check_available()?;
        let state = self.state.lock().await;
        let mut items: Vec<Item> = state.items.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(items)
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        self.check_available()?;
        Ok(self.state.lock().await.items.get(&id).cloned())
    }

    async fn insert_item(&self, item: &NewItem) -> Result<Item, RepositoryError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let id = ItemId::new(state.next_id);
        state.next_id += 1;

        let row = Item {
            id,
            name: item.name.clone(),
            url: item.url.clone(),
            price: item.price.clone(),
            size: item.size.clone(),
            notes: item.notes.clone(),
            claimed_at: None,
            created_at: Utc::now(),
        };
        state.items.insert(id, row.clone());
        drop(state);

        self.publish(ItemChange::Insert { id });
        Ok(row)
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool, RepositoryError> {
        self.check_available()?;
        let removed = self.state.lock().await.items.remove(&id).is_some();
        if removed {
            self.publish(ItemChange::Delete { id });
        }
        Ok(removed)
    }

    async fn claim_item(
        &self,
        id: ItemId,
        at: DateTime<Utc>,
    ) -> Result<Option<Item>, RepositoryError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let Some(item) = state.items.get_mut(&id).filter(|item| item.is_open()) else {
            return Ok(None);
        };
        item.claimed_at = Some(at);
        let claimed = item.clone();
        drop(state);

        self.publish(ItemChange::Update { id });
        Ok(Some(claimed))
    }

    async fn release_claim(
        &self,
        id: ItemId,
        claimed_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        self.check_available()?;
        if self.fail_releases.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut state = self.state.lock().await;
        let Some(item) = state
            .items
            .get_mut(&id)
            .filter(|item| item.claimed_at == Some(claimed_at))
        else {
            return Ok(false);
        };
        item.claimed_at = None;
        drop(state);

        self.publish(ItemChange::Update { id });
        Ok(true)
    }

    async fn get_config(&self, key: &str) -> Result<Option<JsonValue>, RepositoryError> {
        self.check_available()?;
        Ok(self.state.lock().await.config.get(key).cloned())
    }

    async fn upsert_config(&self, key: &str, value: &JsonValue) -> Result<(), RepositoryError> {
        self.check_available()?;
        self.state
            .lock()
            .await
            .config
            .insert(key.to_owned(), value.clone());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ItemChange> {
        self.changes.subscribe()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.check_available()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    async fn store_with_item(name: &str) -> (MemoryStore, Item) {
        let store = MemoryStore::new();
        let item = store
            .insert_item(&NewItem::new(name).unwrap())
            .await
            .unwrap();
        (store, item)
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let a = store.insert_item(&NewItem::new("A").unwrap()).await.unwrap();
        let b = store.insert_item(&NewItem::new("B").unwrap()).await.unwrap();
        assert!(b.id > a.id);
        assert!(a.is_open());
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let store = MemoryStore::new();
        store.insert_item(&NewItem::new("first").unwrap()).await.unwrap();
        store.insert_item(&NewItem::new("second").unwrap()).await.unwrap();
        let names: Vec<String> = store
            .list_items()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, ["second", "first"]);
    }

    #[tokio::test]
    async fn test_claim_only_once() {
        let (store, item) = store_with_item("Stroller").await;
        let first = store.claim_item(item.id, Utc::now()).await.unwrap();
        assert!(first.is_some_and(|i| i.claimed_at.is_some()));

        let second = store.claim_item(item.id, Utc::now()).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_claim_missing_item_returns_none() {
        let store = MemoryStore::new();
        let result = store.claim_item(ItemId::new(404), Utc::now()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_claims_single_winner() {
        let (store, item) = store_with_item("Crib").await;
        let store = Arc::new(store);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.claim_item(item.id, Utc::now()).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_release_requires_matching_timestamp() {
        let (store, item) = store_with_item("Bottle warmer").await;
        let at = Utc::now();
        store.claim_item(item.id, at).await.unwrap();

        let other = at + chrono::Duration::seconds(1);
        assert!(!store.release_claim(item.id, other).await.unwrap());
        assert!(store.release_claim(item.id, at).await.unwrap());
        assert!(store.get_item(item.id).await.unwrap().unwrap().is_open());
    }

    #[tokio::test]
    async fn test_unavailable_store_errors() {
        let (store, item) = store_with_item("Blanket").await;
        store.set_unavailable(true);
        assert!(matches!(
            store.claim_item(item.id, Utc::now()).await,
            Err(RepositoryError::Database(_))
        ));
        assert!(store.ping().await.is_err());
    }

    #[tokio::test]
    async fn test_mutations_publish_changes() {
        let store = MemoryStore::new();
        let mut changes = store.subscribe();
        let item = store.insert_item(&NewItem::new("Toy").unwrap()).await.unwrap();
        store.claim_item(item.id, Utc::now()).await.unwrap();
        store.delete_item(item.id).await.unwrap();

        assert_eq!(changes.recv().await.unwrap(), ItemChange::Insert { id: item.id });
        assert_eq!(changes.recv().await.unwrap(), ItemChange::Update { id: item.id });
        assert_eq!(changes.recv().await.unwrap(), ItemChange::Delete { id: item.id });
    }
}
