//! `PgRegistryStore` against a real database.
//!
//! These tests require a migrated `PostgreSQL` database in `DATABASE_URL`
//! (`registry-cli migrate`). Run with:
//!
//! ```bash
//! cargo test -p gift-registry-integration-tests -- --ignored
//! ```

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{SubsecRound, Utc};
use secrecy::SecretString;

use gift_registry_core::{NewItem, RecipientList};
use gift_registry_server::db::config::{load_recipients, save_recipients};
use gift_registry_server::db::{self, ItemChange, PgRegistryStore, RegistryStore};

async fn store() -> PgRegistryStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = db::create_pool(&SecretString::from(url)).await.unwrap();
    PgRegistryStore::new(pool)
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_concurrent_claims_single_winner() {
    let store = Arc::new(store().await);
    let item = store
        .insert_item(&NewItem::new("Race test").unwrap())
        .await
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .claim_item(item.id, Utc::now().trunc_subsecs(6))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);

    store.delete_item(item.id).await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_release_only_clears_own_timestamp() {
    let store = store().await;
    let item = store
        .insert_item(&NewItem::new("Release test").unwrap())
        .await
        .unwrap();

    let at = Utc::now().trunc_subsecs(6);
    let claimed = store.claim_item(item.id, at).await.unwrap().unwrap();
    assert_eq!(claimed.claimed_at, Some(at));

    let other = at - chrono::Duration::seconds(1);
    assert!(!store.release_claim(item.id, other).await.unwrap());
    assert!(store.release_claim(item.id, at).await.unwrap());
    assert!(store.get_item(item.id).await.unwrap().unwrap().is_open());

    store.delete_item(item.id).await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_recipients_upsert() {
    let store = store().await;
    let list = RecipientList::parse("a@x.ch, b@y.ch");
    save_recipients(&store, &list).await.unwrap();
    assert_eq!(load_recipients(&store).await.unwrap(), list);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_trigger_notifies_listener() {
    let store = store().await;
    let _listener = store.spawn_listener().await.unwrap();
    let mut changes = store.subscribe();

    let item = store
        .insert_item(&NewItem::new("Notify test").unwrap())
        .await
        .unwrap();

    let change = tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(change, ItemChange::Insert { id: item.id });

    store.delete_item(item.id).await.unwrap();
}
