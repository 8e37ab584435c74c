//! Handle to one named collection.

use crate::{EncryptionKey, KvDatabase, KvError, KvResult};
use rusqlite::{params, OptionalExtension};
use std::sync::Arc;
use tracing::debug;

/// A named key-value collection inside a [`crate::KvStore`].
///
/// Handles are cheap to clone and all clones share the same collection.
/// Values are UTF-8 strings; in an encrypted collection each value is sealed
/// with its own nonce before it reaches SQLite.
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

struct CollectionInner {
    name: String,
    db: KvDatabase,
    key: Option<EncryptionKey>,
}

impl Collection {
    pub(crate) fn new(name: &str, db: KvDatabase, key: Option<EncryptionKey>) -> Self {
        Self {
            inner: Arc::new(CollectionInner {
                name: name.to_string(),
                db,
                key,
            }),
        }
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether values are encrypted at rest.
    pub fn is_encrypted(&self) -> bool {
        self.inner.key.is_some()
    }

    pub(crate) fn key(&self) -> Option<&EncryptionKey> {
        self.inner.key.as_ref()
    }

    /// Get the value stored at `key`.
    pub async fn get(&self, key: &str) -> KvResult<Option<String>> {
        debug!(collection = %self.inner.name, key = %key, "Getting entry");

        let name = self.inner.name.clone();
        let entry_key = key.to_string();
        let row: Option<(Vec<u8>, Option<Vec<u8>>)> = self
            .inner
            .db
            .call_sqlite(move |conn| {
                conn.query_row(
                    "SELECT value, nonce FROM entries WHERE collection = ?1 AND key = ?2",
                    params![name, entry_key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
            })
            .await?;

        match row {
            Some((value, nonce)) => self.decode(value, nonce).map(Some),
            None => Ok(None),
        }
    }

    /// Check whether `key` exists.
    pub async fn contains_key(&self, key: &str) -> KvResult<bool> {
        let name = self.inner.name.clone();
        let entry_key = key.to_string();
        self.inner
            .db
            .call_sqlite(move |conn| {
                conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM entries WHERE collection = ?1 AND key = ?2)",
                    params![name, entry_key],
                    |row| row.get(0),
                )
            })
            .await
    }

    /// Store `value` at `key`, replacing any previous value.
    pub async fn put(&self, key: &str, value: &str) -> KvResult<()> {
        debug!(collection = %self.inner.name, key = %key, "Putting entry");

        let (stored, nonce) = self.encode(value)?;
        let name = self.inner.name.clone();
        let entry_key = key.to_string();
        self.inner
            .db
            .call_sqlite(move |conn| {
                conn.execute(
                    "INSERT INTO entries (collection, key, value, nonce)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(collection, key) DO UPDATE SET
                        value = excluded.value,
                        nonce = excluded.nonce,
                        updated_at = datetime('now')",
                    params![name, entry_key, stored, nonce],
                )
            })
            .await?;
        Ok(())
    }

    /// Delete `key`. Returns whether an entry was removed.
    pub async fn delete(&self, key: &str) -> KvResult<bool> {
        debug!(collection = %self.inner.name, key = %key, "Deleting entry");

        let name = self.inner.name.clone();
        let entry_key = key.to_string();
        let removed = self
            .inner
            .db
            .call_sqlite(move |conn| {
                conn.execute(
                    "DELETE FROM entries WHERE collection = ?1 AND key = ?2",
                    params![name, entry_key],
                )
            })
            .await?;
        Ok(removed > 0)
    }

    /// All keys in the collection, sorted.
    pub async fn keys(&self) -> KvResult<Vec<String>> {
        let name = self.inner.name.clone();
        self.inner
            .db
            .call_sqlite(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT key FROM entries WHERE collection = ?1 ORDER BY key")?;
                let keys = stmt
                    .query_map([name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
    }

    /// Number of entries in the collection.
    pub async fn len(&self) -> KvResult<usize> {
        let name = self.inner.name.clone();
        let count: i64 = self
            .inner
            .db
            .call_sqlite(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE collection = ?1",
                    [name],
                    |row| row.get(0),
                )
            })
            .await?;
        usize::try_from(count).map_err(|e| KvError::InvalidData(e.to_string()))
    }

    /// Whether the collection has no entries.
    pub async fn is_empty(&self) -> KvResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Remove every entry. Returns how many were removed.
    pub async fn clear(&self) -> KvResult<usize> {
        debug!(collection = %self.inner.name, "Clearing collection");

        let name = self.inner.name.clone();
        self.inner
            .db
            .call_sqlite(move |conn| {
                conn.execute("DELETE FROM entries WHERE collection = ?1", [name])
            })
            .await
    }

    fn encode(&self, value: &str) -> KvResult<(Vec<u8>, Option<Vec<u8>>)> {
        match &self.inner.key {
            Some(key) => {
                let (nonce, ciphertext) = key.seal(value.as_bytes())?;
                Ok((ciphertext, Some(nonce.to_vec())))
            }
            None => Ok((value.as_bytes().to_vec(), None)),
        }
    }

    fn decode(&self, stored: Vec<u8>, nonce: Option<Vec<u8>>) -> KvResult<String> {
        let plaintext = match (&self.inner.key, nonce) {
            (Some(key), Some(nonce)) => key.open(&nonce, &stored)?,
            (Some(_), None) => {
                return Err(KvError::InvalidData(format!(
                    "Unencrypted entry in encrypted collection {}",
                    self.inner.name
                )))
            }
            (None, _) => stored,
        };
        String::from_utf8(plaintext).map_err(|e| KvError::InvalidData(e.to_string()))
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.inner.name)
            .field("encrypted", &self.is_encrypted())
            .finish()
    }
}
