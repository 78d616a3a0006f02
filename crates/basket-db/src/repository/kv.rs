//! # Key-Value Repository
//!
//! Reads and upserts rows of the `kv_store` table.
//!
//! ## Write Semantics
//! ```text
//! set(key, value)
//!      │
//!      ▼
//! INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
//! ON CONFLICT(key) DO UPDATE SET value = excluded.value,
//!                                updated_at = excluded.updated_at
//!
//! Last write wins. The snapshot writer guarantees writes for one key
//! arrive in mutation order.
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for key-value operations.
#[derive(Debug, Clone)]
pub struct KvRepository {
    pool: SqlitePool,
}

impl KvRepository {
    /// Creates a new KvRepository.
    pub fn new(pool: SqlitePool) -> Self {
        KvRepository { pool }
    }

    /// Reads the value stored under `key`.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value)
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        let now = Utc::now();

        debug!(key = %key, bytes = value.len(), "Upserting key");

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns when `key` was last written.
    pub async fn updated_at(&self, key: &str) -> DbResult<Option<DateTime<Utc>>> {
        let updated: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT updated_at FROM kv_store WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_upsert_keeps_single_row() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.kv();

        repo.set("k", "one").await.unwrap();
        repo.set("k", "two").await.unwrap();

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kv_store")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(repo.get("k").await.unwrap().as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_updated_at_tracks_writes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.kv();

        assert!(repo.updated_at("k").await.unwrap().is_none());
        repo.set("k", "v").await.unwrap();
        assert!(repo.updated_at("k").await.unwrap().is_some());
    }
}
