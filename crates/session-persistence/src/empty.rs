//! Storage backend that persists nothing.

use crate::{LocalStorage, StorageResult};
use async_trait::async_trait;

/// A [`LocalStorage`] that never stores anything.
///
/// Use it to keep sessions in memory only. Every read reports no session and
/// every write is dropped. No operation can fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyLocalStorage;

#[async_trait]
impl LocalStorage for EmptyLocalStorage {
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn has_access_token(&self) -> StorageResult<bool> {
        Ok(false)
    }

    async fn access_token(&self) -> StorageResult<Option<String>> {
        Ok(None)
    }

    async fn persist_session(&self, _session: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn remove_persisted_session(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_storage_ignores_writes() {
        let storage = EmptyLocalStorage;
        storage.initialize().await.unwrap();
        assert!(!storage.has_access_token().await.unwrap());

        storage.persist_session("x").await.unwrap();
        assert!(!storage.has_access_token().await.unwrap());
        assert_eq!(storage.access_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_storage_never_fails() {
        let storage = EmptyLocalStorage;
        for session in ["a", "", "{\"access_token\":\"t\"}"] {
            storage.initialize().await.unwrap();
            storage.persist_session(session).await.unwrap();
            storage.remove_persisted_session().await.unwrap();
            storage.remove_persisted_session().await.unwrap();
            assert!(!storage.has_access_token().await.unwrap());
            assert!(storage.access_token().await.unwrap().is_none());
        }
    }
}
