//! Local observation store queries
//!
//! Each entry is one JSON document keyed by `test_observations_{owner}`.
//! Writes replace the whole document.

use crate::db::retry::retry_on_lock;
use crate::Result;
use sqlx::SqlitePool;
use std::time::Duration;

/// Upper bound on lock-retry time for a single write
const MAX_LOCK_WAIT: Duration = Duration::from_millis(2000);

/// Key and bookkeeping of one stored entry (without the document body)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntrySummary {
    pub key: String,
    pub updated_at: String,
    pub size_bytes: i64,
}

/// Insert or replace the document stored under `key`
pub async fn put_entry(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    let updated_at = crate::time::to_wire(&crate::time::now());
    let updated_at = updated_at.as_str();

    retry_on_lock("local observation write", MAX_LOCK_WAIT, move || async move {
        sqlx::query(
            r#"
            INSERT INTO local_observations (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(updated_at)
        .execute(pool)
        .await?;
        Ok(())
    })
    .await
}

/// Fetch the document stored under `key`
pub async fn get_entry(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<String> =
        sqlx::query_scalar("SELECT value FROM local_observations WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;
    Ok(value)
}

/// List stored entries, most recently updated first
pub async fn list_entries(pool: &SqlitePool) -> Result<Vec<LocalEntrySummary>> {
    let rows: Vec<(String, String, i64)> = sqlx::query_as(
        "SELECT key, updated_at, LENGTH(value) FROM local_observations ORDER BY updated_at DESC, key",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(key, updated_at, size_bytes)| LocalEntrySummary {
            key,
            updated_at,
            size_bytes,
        })
        .collect())
}
