//! Typed access to registry config entries.

use gift_registry_core::{RECIPIENTS_KEY, RecipientList};

use super::{RegistryStore, RepositoryError};

/// Load the configured owner recipient list.
///
/// A missing row yields an empty list.
///
/// # Errors
///
/// Returns an error if the store query fails.
pub async fn load_recipients(store: &dyn RegistryStore) -> Result<RecipientList, RepositoryError> {
    Ok(store
        .get_config(RECIPIENTS_KEY)
        .await?
        .map(|value| RecipientList::from_config_value(&value))
        .unwrap_or_default())
}

/// Store the owner recipient list, replacing any previous value.
///
/// # Errors
///
/// Returns an error if the store write fails.
pub async fn save_recipients(
    store: &dyn RegistryStore,
    recipients: &RecipientList,
) -> Result<(), RepositoryError> {
    store
        .upsert_config(RECIPIENTS_KEY, &recipients.to_config_value())
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_missing_recipients_is_empty() {
        let store = MemoryStore::new();
        assert!(load_recipients(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_recipients() {
        let store = MemoryStore::new();
        let list = RecipientList::parse("mum@home.ch , dad@home.ch");
        save_recipients(&store, &list).await.unwrap();
        assert_eq!(load_recipients(&store).await.unwrap(), list);

        // Last writer wins.
        let replacement = RecipientList::parse("gran@home.ch");
        save_recipients(&store, &replacement).await.unwrap();
        assert_eq!(load_recipients(&store).await.unwrap(), replacement);
    }
}
