//! Local persistence for auth sessions and PKCE flow verifiers.
//!
//! This crate provides:
//! - **`LocalStorage`**: the session persistence contract
//! - **`EmptyLocalStorage`**: persists nothing, for in-memory-only sessions
//! - **`KvLocalStorage`**: keeps the session in the `supabase_authentication` collection
//! - **`KvVerifierStorage`**: keeps PKCE verifiers in the `gotrue` collection
//!
//! Both key-value backends sit on a [`kv_collections::KvStore`]. Store
//! failures reach the caller unchanged as [`StorageError::Backend`].

mod empty;
mod keys;
mod kv_local;
mod kv_verifier;
mod traits;

pub use empty::EmptyLocalStorage;
pub use keys::StorageKeys;
pub use kv_local::KvLocalStorage;
pub use kv_verifier::KvVerifierStorage;
pub use traits::{AsyncVerifierStorage, LocalStorage};

use kv_collections::{EncryptionKey, KvError, KvStore};
use persistence_config::{Paths, SessionPersistence};
use thiserror::Error;
use tracing::info;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failure raised by the underlying key-value store
    #[error(transparent)]
    Backend(#[from] KvError),

    /// Configured encryption key could not be decoded
    #[error("Invalid encryption key: {0}")]
    InvalidEncryptionKey(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Open the key-value store at the configured database path.
pub async fn open_store(paths: &Paths) -> StorageResult<KvStore> {
    Ok(KvStore::open(&paths.database_file()).await?)
}

/// Create the session storage selected by `persistence`.
///
/// Disabled persistence yields [`EmptyLocalStorage`]; otherwise a
/// [`KvLocalStorage`] on `store`, encrypted when a key is configured.
pub fn create_local_storage(
    store: &KvStore,
    persistence: &SessionPersistence,
) -> StorageResult<Box<dyn LocalStorage>> {
    if !persistence.enabled {
        info!("Session persistence disabled, sessions stay in memory");
        return Ok(Box::new(EmptyLocalStorage));
    }

    let mut storage = KvLocalStorage::new(store.clone());
    if let Some(encoded) = &persistence.encryption_key {
        let key = EncryptionKey::from_base64url(encoded)
            .map_err(|e| StorageError::InvalidEncryptionKey(e.to_string()))?;
        storage = storage.with_encryption_key(key);
    }

    Ok(Box::new(storage))
}

/// Create PKCE verifier storage on `store`.
pub fn create_verifier_storage(store: &KvStore) -> Box<dyn AsyncVerifierStorage> {
    Box::new(KvVerifierStorage::new(store.clone()))
}
