//! Storage trait definitions.

use crate::StorageResult;
use async_trait::async_trait;

/// Local persistence for the current auth session.
///
/// The session is an opaque string (usually serialized JSON). At most one
/// session is stored at a time.
#[async_trait]
pub trait LocalStorage: Send + Sync {
    /// Prepare the backend for use. Safe to call more than once.
    async fn initialize(&self) -> StorageResult<()>;

    /// Whether a session is currently stored.
    async fn has_access_token(&self) -> StorageResult<bool>;

    /// The stored session, if any.
    async fn access_token(&self) -> StorageResult<Option<String>>;

    /// Store `session`, replacing any previous one.
    async fn persist_session(&self, session: &str) -> StorageResult<()>;

    /// Delete the stored session. Succeeds when nothing is stored.
    async fn remove_persisted_session(&self) -> StorageResult<()>;
}

/// Key-value storage for PKCE code verifiers, one entry per in-flight flow.
#[async_trait]
pub trait AsyncVerifierStorage: Send + Sync {
    /// Value stored at `key`, if any.
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` at `key`, replacing any previous value.
    async fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete `key`. Succeeds when the key is absent.
    async fn remove_item(&self, key: &str) -> StorageResult<()>;
}
