//! PKCE verifier storage backed by a key-value collection.

use crate::{AsyncVerifierStorage, StorageKeys, StorageResult};
use async_trait::async_trait;
use kv_collections::{Collection, KvStore};
use tokio::sync::OnceCell;
use tracing::debug;

/// An [`AsyncVerifierStorage`] on the `gotrue` collection.
///
/// Verifiers are short-lived and keyed per flow, so they live apart from
/// the session collection.
pub struct KvVerifierStorage {
    store: KvStore,
    collection: OnceCell<Collection>,
}

impl KvVerifierStorage {
    pub fn new(store: KvStore) -> Self {
        Self {
            store,
            collection: OnceCell::new(),
        }
    }

    async fn collection(&self) -> StorageResult<&Collection> {
        let collection = self
            .collection
            .get_or_try_init(|| async {
                self.store
                    .open_collection(StorageKeys::VERIFIER_COLLECTION, None)
                    .await
            })
            .await?;
        Ok(collection)
    }
}

#[async_trait]
impl AsyncVerifierStorage for KvVerifierStorage {
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.collection().await?.get(key).await?)
    }

    async fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.collection().await?.put(key, value).await?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        let removed = self.collection().await?.delete(key).await?;
        debug!(key = %key, removed, "Verifier removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn storage() -> KvVerifierStorage {
        KvVerifierStorage::new(KvStore::open_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_set_get_remove() {
        let storage = storage().await;

        storage.set_item("k", "v").await.unwrap();
        assert_eq!(storage.get_item("k").await.unwrap().as_deref(), Some("v"));

        storage.remove_item("k").await.unwrap();
        assert_eq!(storage.get_item("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_missing_key() {
        let storage = storage().await;
        storage.remove_item("never-set").await.unwrap();
        assert_eq!(storage.get_item("never-set").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let storage = storage().await;

        storage.set_item("k1", "first").await.unwrap();
        storage.set_item("k2", "second").await.unwrap();

        storage.set_item("k1", "updated").await.unwrap();
        assert_eq!(storage.get_item("k2").await.unwrap().as_deref(), Some("second"));

        storage.remove_item("k1").await.unwrap();
        assert_eq!(storage.get_item("k1").await.unwrap(), None);
        assert_eq!(storage.get_item("k2").await.unwrap().as_deref(), Some("second"));
    }
}
