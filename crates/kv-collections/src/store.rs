//! Registry of opened collections over one database.

use crate::{Collection, EncryptionKey, KvDatabase, KvError, KvResult};
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Marker sealed into `collections.key_check` when an encrypted collection is created.
const KEY_CHECK_MARKER: &[u8] = b"kv-collections:key-check:v1";

/// Stored registration of a collection: (encrypted, key_check, key_check_nonce).
type Registration = (bool, Option<Vec<u8>>, Option<Vec<u8>>);

/// A key-value store holding any number of named collections.
///
/// Collections are opened lazily and cached, so every later
/// [`KvStore::open_collection`] call with the same name returns the same
/// handle. Nothing is closed until the store itself is dropped.
#[derive(Clone)]
pub struct KvStore {
    db: KvDatabase,
    open: Arc<Mutex<HashMap<String, Collection>>>,
}

impl KvStore {
    /// Open (or create) a store backed by the SQLite file at `path`.
    pub async fn open(path: &Path) -> KvResult<Self> {
        Ok(Self::from_database(KvDatabase::open(path).await?))
    }

    /// Open a store that lives only in memory.
    pub async fn open_in_memory() -> KvResult<Self> {
        Ok(Self::from_database(KvDatabase::open_in_memory().await?))
    }

    /// Wrap an already opened database.
    pub fn from_database(db: KvDatabase) -> Self {
        Self {
            db,
            open: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The underlying database.
    pub fn database(&self) -> &KvDatabase {
        &self.db
    }

    /// Open the collection `name`, creating it on first use.
    ///
    /// A collection created with a key is encrypted for life. Reopening it
    /// requires the same key: a different key fails with
    /// [`KvError::Encryption`], and switching between encrypted and plain
    /// fails with [`KvError::KeyMismatch`].
    pub async fn open_collection(
        &self,
        name: &str,
        key: Option<EncryptionKey>,
    ) -> KvResult<Collection> {
        if name.trim().is_empty() {
            return Err(KvError::InvalidData(
                "Collection name must not be empty".to_string(),
            ));
        }

        let mut open = self.open.lock().await;

        if let Some(existing) = open.get(name) {
            if existing.key() != key.as_ref() {
                warn!(collection = %name, "Collection already open with a different encryption key");
                return Err(KvError::KeyMismatch(format!(
                    "Collection {} is already open with a different encryption setting",
                    name
                )));
            }
            return Ok(existing.clone());
        }

        self.register(name, key.as_ref()).await?;

        let collection = Collection::new(name, self.db.clone(), key);
        open.insert(name.to_string(), collection.clone());

        info!(
            collection = %name,
            encrypted = collection.is_encrypted(),
            "Opened collection"
        );
        Ok(collection)
    }

    /// Whether `name` has been opened through this store.
    pub async fn is_collection_open(&self, name: &str) -> bool {
        self.open.lock().await.contains_key(name)
    }

    /// Create the registration row, or validate the key against an existing one.
    async fn register(&self, name: &str, key: Option<&EncryptionKey>) -> KvResult<()> {
        let lookup_name = name.to_string();
        let existing: Option<Registration> = self
            .db
            .call_sqlite(move |conn| {
                conn.query_row(
                    "SELECT encrypted, key_check, key_check_nonce FROM collections WHERE name = ?1",
                    [lookup_name],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()
            })
            .await?;

        match (existing, key) {
            (None, key) => self.create(name, key).await,
            (Some((false, _, _)), None) => Ok(()),
            (Some((false, _, _)), Some(_)) => {
                warn!(collection = %name, "Encryption key supplied for a plain collection");
                Err(KvError::KeyMismatch(format!(
                    "Collection {} is not encrypted",
                    name
                )))
            }
            (Some((true, _, _)), None) => {
                warn!(collection = %name, "Encrypted collection opened without a key");
                Err(KvError::KeyMismatch(format!(
                    "Collection {} is encrypted and requires a key",
                    name
                )))
            }
            (Some((true, Some(check), Some(nonce))), Some(key)) => {
                let marker = key.open(&nonce, &check)?;
                if marker != KEY_CHECK_MARKER {
                    return Err(KvError::Encryption(format!(
                        "Key check failed for collection {}",
                        name
                    )));
                }
                Ok(())
            }
            (Some((true, _, _)), Some(_)) => Err(KvError::InvalidData(format!(
                "Collection {} is missing its key check",
                name
            ))),
        }
    }

    async fn create(&self, name: &str, key: Option<&EncryptionKey>) -> KvResult<()> {
        let (check, nonce) = match key {
            Some(key) => {
                let (nonce, check) = key.seal(KEY_CHECK_MARKER)?;
                (Some(check), Some(nonce.to_vec()))
            }
            None => (None, None),
        };
        let encrypted = key.is_some();
        let insert_name = name.to_string();

        self.db
            .call_sqlite(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO collections (name, encrypted, key_check, key_check_nonce)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![insert_name, encrypted, check, nonce],
                )
            })
            .await?;

        info!(collection = %name, encrypted, "Created collection");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_collection_is_cached() {
        let store = KvStore::open_in_memory().await.unwrap();
        assert!(!store.is_collection_open("gotrue").await);

        let first = store.open_collection("gotrue", None).await.unwrap();
        let second = store.open_collection("gotrue", None).await.unwrap();
        assert!(store.is_collection_open("gotrue").await);

        first.put("k", "v").await.unwrap();
        assert_eq!(second.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let store = KvStore::open_in_memory().await.unwrap();
        let result = store.open_collection("  ", None).await;
        assert!(matches!(result, Err(KvError::InvalidData(_))));
    }

    #[tokio::test]
    async fn test_cached_collection_rejects_different_key() {
        let store = KvStore::open_in_memory().await.unwrap();
        let key = EncryptionKey::generate();

        store.open_collection("secure", Some(key.clone())).await.unwrap();

        assert!(store.open_collection("secure", Some(key)).await.is_ok());
        let other = store
            .open_collection("secure", Some(EncryptionKey::generate()))
            .await;
        assert!(matches!(other, Err(KvError::KeyMismatch(_))));
        let plain = store.open_collection("secure", None).await;
        assert!(matches!(plain, Err(KvError::KeyMismatch(_))));
    }

    #[tokio::test]
    async fn test_reopen_encrypted_with_same_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.sqlite");
        let key = EncryptionKey::generate();

        {
            let store = KvStore::open(&path).await.unwrap();
            let collection = store.open_collection("secure", Some(key.clone())).await.unwrap();
            collection.put("session", "payload").await.unwrap();
        }

        let store = KvStore::open(&path).await.unwrap();
        let collection = store.open_collection("secure", Some(key)).await.unwrap();
        assert_eq!(
            collection.get("session").await.unwrap().as_deref(),
            Some("payload")
        );
    }

    #[tokio::test]
    async fn test_reopen_encrypted_with_wrong_key_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.sqlite");

        {
            let store = KvStore::open(&path).await.unwrap();
            store
                .open_collection("secure", Some(EncryptionKey::generate()))
                .await
                .unwrap();
        }

        let store = KvStore::open(&path).await.unwrap();
        let result = store
            .open_collection("secure", Some(EncryptionKey::generate()))
            .await;
        assert!(matches!(result, Err(KvError::Encryption(_))));
        assert!(!store.is_collection_open("secure").await);
    }

    #[tokio::test]
    async fn test_reopen_switching_encryption_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.sqlite");

        {
            let store = KvStore::open(&path).await.unwrap();
            store.open_collection("plain", None).await.unwrap();
            store
                .open_collection("secure", Some(EncryptionKey::generate()))
                .await
                .unwrap();
        }

        let store = KvStore::open(&path).await.unwrap();
        let plain = store
            .open_collection("plain", Some(EncryptionKey::generate()))
            .await;
        assert!(matches!(plain, Err(KvError::KeyMismatch(_))));

        let secure = store.open_collection("secure", None).await;
        assert!(matches!(secure, Err(KvError::KeyMismatch(_))));
    }
}
