//! # Key-Value Store Seam
//!
//! The async string key-value interface the cart persists through.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       KeyValueStore                                     │
//! │                                                                         │
//! │  get(key)        → Ok(Some(value))  key present                         │
//! │                  → Ok(None)         key missing                         │
//! │                  → Err(DbError)     backend failure (NEVER "missing")   │
//! │                                                                         │
//! │  set(key, value) → Ok(())           stored, replaces any prior value    │
//! │                  → Err(DbError)     backend failure                     │
//! │                                                                         │
//! │  Values are opaque strings. Calls may be slow; callers must not hold    │
//! │  locks across them.                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Implementations
//! - [`MemoryStore`] - process-local map, for tests and ephemeral sessions
//! - [`crate::Database`] - SQLite file, survives restarts

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DbResult;

/// Async string key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a value. Missing keys are `Ok(None)`.
    async fn get(&self, key: &str) -> DbResult<Option<String>>;

    /// Writes a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> DbResult<()>;
}

/// In-memory key-value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with one entry.
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut entries = HashMap::new();
        entries.insert(key.into(), value.into());
        MemoryStore {
            entries: RwLock::new(entries),
        }
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Checks if the store has no keys.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> DbResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
