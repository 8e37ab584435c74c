//! Named key-value collections backed by a single SQLite file.
//!
//! This crate provides:
//! - Async SQLite executor with a dedicated thread
//! - Schema migrations for the collection and entry tables
//! - Lazily opened, cached collection handles
//! - Optional ChaCha20-Poly1305 encryption of values per collection
//!
//! # Example
//!
//! ```ignore
//! let store = KvStore::open(&path).await?;
//! let collection = store.open_collection("gotrue", None).await?;
//! collection.put("flow-1", "verifier").await?;
//! assert_eq!(collection.get("flow-1").await?.as_deref(), Some("verifier"));
//! ```
//!
//! Encryption happens on the caller's task. Only SQL runs on the executor
//! thread.

mod collection;
mod encryption;
mod error;
mod executor;
mod migrations;
mod store;

pub use collection::Collection;
pub use encryption::{EncryptionKey, KEY_SIZE, NONCE_SIZE};
pub use error::{KvError, KvResult};
pub use executor::KvDatabase;
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use store::KvStore;
