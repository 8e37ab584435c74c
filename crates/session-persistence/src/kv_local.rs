//! Session storage backed by a key-value collection.

use crate::{LocalStorage, StorageKeys, StorageResult};
use async_trait::async_trait;
use kv_collections::{Collection, EncryptionKey, KvStore};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// A [`LocalStorage`] that keeps the session in the
/// `supabase_authentication` collection under a single fixed key.
///
/// The collection is opened on [`LocalStorage::initialize`] or on the first
/// operation, whichever comes first, and the handle is kept for the lifetime
/// of this value. The encryption key is fixed at construction.
pub struct KvLocalStorage {
    store: KvStore,
    encryption_key: Option<EncryptionKey>,
    collection: OnceCell<Collection>,
}

impl KvLocalStorage {
    /// Create session storage on `store` without encryption.
    pub fn new(store: KvStore) -> Self {
        Self {
            store,
            encryption_key: None,
            collection: OnceCell::new(),
        }
    }

    /// Encrypt the session collection with `key`.
    ///
    /// Data written under one key cannot be read back under another.
    pub fn with_encryption_key(mut self, key: EncryptionKey) -> Self {
        self.encryption_key = Some(key);
        self
    }

    /// Whether the session collection is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.encryption_key.is_some()
    }

    async fn collection(&self) -> StorageResult<&Collection> {
        let collection = self
            .collection
            .get_or_try_init(|| async {
                self.store
                    .open_collection(
                        StorageKeys::SESSION_COLLECTION,
                        self.encryption_key.clone(),
                    )
                    .await
            })
            .await?;
        Ok(collection)
    }
}

#[async_trait]
impl LocalStorage for KvLocalStorage {
    async fn initialize(&self) -> StorageResult<()> {
        let collection = self.collection().await?;
        info!(
            collection = %collection.name(),
            encrypted = collection.is_encrypted(),
            "Session storage initialized"
        );
        Ok(())
    }

    async fn has_access_token(&self) -> StorageResult<bool> {
        let collection = self.collection().await?;
        Ok(collection.contains_key(StorageKeys::PERSIST_SESSION_KEY).await?)
    }

    async fn access_token(&self) -> StorageResult<Option<String>> {
        let collection = self.collection().await?;
        Ok(collection.get(StorageKeys::PERSIST_SESSION_KEY).await?)
    }

    async fn persist_session(&self, session: &str) -> StorageResult<()> {
        let collection = self.collection().await?;
        collection
            .put(StorageKeys::PERSIST_SESSION_KEY, session)
            .await?;
        debug!("Session persisted");
        Ok(())
    }

    async fn remove_persisted_session(&self) -> StorageResult<()> {
        let collection = self.collection().await?;
        let removed = collection.delete(StorageKeys::PERSIST_SESSION_KEY).await?;
        debug!(removed, "Persisted session removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageError;
    use kv_collections::KvError;

    async fn storage() -> KvLocalStorage {
        KvLocalStorage::new(KvStore::open_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_persist_then_read() {
        let storage = storage().await;
        storage.initialize().await.unwrap();
        assert!(!storage.has_access_token().await.unwrap());

        storage.persist_session("tok1").await.unwrap();
        assert!(storage.has_access_token().await.unwrap());
        assert_eq!(storage.access_token().await.unwrap().as_deref(), Some("tok1"));
    }

    #[tokio::test]
    async fn test_overwrite_keeps_latest() {
        let storage = storage().await;
        storage.persist_session("a").await.unwrap();
        storage.persist_session("b").await.unwrap();
        assert_eq!(storage.access_token().await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_remove_twice() {
        let storage = storage().await;
        storage.persist_session("tok").await.unwrap();

        storage.remove_persisted_session().await.unwrap();
        assert!(!storage.has_access_token().await.unwrap());

        storage.remove_persisted_session().await.unwrap();
        assert!(!storage.has_access_token().await.unwrap());
        assert_eq!(storage.access_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let storage = storage().await;
        storage.initialize().await.unwrap();
        storage.persist_session("tok").await.unwrap();
        storage.initialize().await.unwrap();
        assert_eq!(storage.access_token().await.unwrap().as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_operations_open_collection_lazily() {
        let store = KvStore::open_in_memory().await.unwrap();
        let storage = KvLocalStorage::new(store.clone());
        assert!(!store.is_collection_open(StorageKeys::SESSION_COLLECTION).await);

        assert!(!storage.has_access_token().await.unwrap());
        assert!(store.is_collection_open(StorageKeys::SESSION_COLLECTION).await);
    }

    #[tokio::test]
    async fn test_encrypted_session() {
        let storage = storage().await.with_encryption_key(EncryptionKey::generate());
        assert!(storage.is_encrypted());

        storage.initialize().await.unwrap();
        storage.persist_session("{\"access_token\":\"t\"}").await.unwrap();
        assert_eq!(
            storage.access_token().await.unwrap().as_deref(),
            Some("{\"access_token\":\"t\"}")
        );
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let store = KvStore::open_in_memory().await.unwrap();
        store
            .open_collection(StorageKeys::SESSION_COLLECTION, None)
            .await
            .unwrap();

        let storage = KvLocalStorage::new(store).with_encryption_key(EncryptionKey::generate());
        let result = storage.initialize().await;
        assert!(matches!(
            result,
            Err(StorageError::Backend(KvError::KeyMismatch(_)))
        ));
    }
}
