//! Async SQLite executor using a dedicated background thread.
//!
//! All SQLite operations run on a single thread and are sent to it through a
//! channel, so callers await results without blocking the Tokio runtime and
//! queries execute in FIFO order.
//!
//! Only SQL belongs inside [`KvDatabase::call`]. Sealing and opening
//! encrypted values happens on the caller's task.

use crate::{migrations, KvError, KvResult};
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

/// Path reported for in-memory databases.
const IN_MEMORY_PATH: &str = ":memory:";

/// Convert a tokio_rusqlite::Error to KvError.
fn from_tokio_rusqlite(e: tokio_rusqlite::Error) -> KvError {
    match e {
        tokio_rusqlite::Error::Rusqlite(e) => KvError::Sqlite(e),
        tokio_rusqlite::Error::Close(_) => KvError::Connection("Connection closed".to_string()),
        other => KvError::Connection(other.to_string()),
    }
}

/// Async SQLite database with a dedicated executor thread.
#[derive(Clone)]
pub struct KvDatabase {
    conn: Connection,
    path: String,
}

impl KvDatabase {
    /// Open a database at the given path.
    ///
    /// This will:
    /// - Create the parent directory and database file if they don't exist
    /// - Enable WAL mode and foreign keys
    /// - Run any pending migrations
    pub async fn open(path: &Path) -> KvResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let path_str = path.to_string_lossy().to_string();

        info!(path = %path_str, "Opening key-value database");

        let conn = Connection::open(path_str.clone())
            .await
            .map_err(|e| KvError::Connection(e.to_string()))?;

        let db = Self {
            conn,
            path: path_str,
        };

        db.call_sqlite(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA foreign_keys = ON;
                PRAGMA busy_timeout = 5000;
                ",
            )
        })
        .await?;

        db.call(migrations::run_migrations).await?;

        info!(path = %db.path, "Key-value database initialized with WAL mode");
        Ok(db)
    }

    /// Open a private in-memory database. Contents are lost when the last
    /// clone is dropped.
    pub async fn open_in_memory() -> KvResult<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| KvError::Connection(e.to_string()))?;

        let db = Self {
            conn,
            path: IN_MEMORY_PATH.to_string(),
        };

        db.call_sqlite(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"))
            .await?;
        db.call(migrations::run_migrations).await?;

        debug!("In-memory key-value database initialized");
        Ok(db)
    }

    /// Execute a closure on the database connection.
    ///
    /// The closure runs on the dedicated SQLite thread. The caller's task is
    /// parked, not blocked, until the result is ready.
    pub async fn call<F, T>(&self, f: F) -> KvResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> KvResult<T> + Send + 'static,
        T: Send + 'static,
    {
        // Our KvResult travels inside tokio_rusqlite's Ok variant and is
        // flattened after the await.
        let outer_result = self.conn.call(move |conn| Ok(f(conn))).await;

        match outer_result {
            Ok(inner) => inner,
            Err(e) => Err(from_tokio_rusqlite(e)),
        }
    }

    /// Execute a closure that returns a rusqlite::Result.
    pub async fn call_sqlite<F, T>(&self, f: F) -> KvResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.conn
            .call(move |conn| Ok(f(conn)?))
            .await
            .map_err(from_tokio_rusqlite)
    }

    /// Get the database file path (`:memory:` for in-memory databases).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Check if the database is healthy by executing a simple query.
    pub async fn health_check(&self) -> KvResult<()> {
        self.call_sqlite(|conn| conn.execute_batch("SELECT 1")).await?;
        debug!("Database health check passed");
        Ok(())
    }

    /// Close the database connection.
    ///
    /// Waits for pending operations, then shuts down the executor thread.
    pub async fn close(self) -> KvResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| KvError::Connection(format!("Failed to close database: {:?}", e)))?;
        info!(path = %self.path, "Database closed");
        Ok(())
    }
}
