//! Local fallback store
//!
//! Durable key-value storage used when the backend cannot be reached. Each
//! value is the same JSON document the remote POST would have carried.

use async_trait::async_trait;
use mtl_common::db::{self, LocalEntrySummary};
use sqlx::SqlitePool;
use std::path::Path;

#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Replace the document under `key`
    async fn write(&self, key: &str, document: &str) -> mtl_common::Result<()>;

    async fn read(&self, key: &str) -> mtl_common::Result<Option<String>>;

    /// Stored keys, most recent first
    async fn list(&self) -> mtl_common::Result<Vec<LocalEntrySummary>>;
}

/// [`LocalStore`] backed by the `local_observations` SQLite table
#[derive(Debug, Clone)]
pub struct SqliteLocalStore {
    pool: SqlitePool,
}

impl SqliteLocalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `path`
    pub async fn open(path: &Path) -> mtl_common::Result<Self> {
        let pool = db::init_database(path).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn write(&self, key: &str, document: &str) -> mtl_common::Result<()> {
        db::put_entry(&self.pool, key, document).await
    }

    async fn read(&self, key: &str) -> mtl_common::Result<Option<String>> {
        db::get_entry(&self.pool, key).await
    }

    async fn list(&self) -> mtl_common::Result<Vec<LocalEntrySummary>> {
        db::list_entries(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteLocalStore::open(&dir.path().join("mtl.db")).await.unwrap();

        assert_eq!(store.read("test_observations_4").await.unwrap(), None);

        store.write("test_observations_4", r#"{"testRows":[]}"#).await.unwrap();
        store.write("test_observations_temp", "{}").await.unwrap();

        assert_eq!(
            store.read("test_observations_4").await.unwrap().as_deref(),
            Some(r#"{"testRows":[]}"#)
        );
        let keys: Vec<String> = store.list().await.unwrap().into_iter().map(|e| e.key).collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&"test_observations_temp".to_string()));
    }
}
