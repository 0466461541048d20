//! Storage port implementations.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Row};

/// Key-value substrate behind the identity stores.
///
/// `put_many` is the atomicity boundary: a canonical record and its
/// reverse-index entries go down in one batch or not at all. A record
/// without its indexes (or the reverse) is a correctness bug, not a
/// degraded state.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write every entry or none of them.
    async fn put_many(&self, entries: Vec<(String, Vec<u8>)>) -> Result<()>;

    /// Compare-and-set: write only if the key is unclaimed.
    /// Returns false when another writer got there first.
    async fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// MemoryStorage (tests, no database required)
// ---------------------------------------------------------------------------

/// In-memory storage for tests. Thread-safe; the whole map is guarded by
/// one lock, which also makes `put_many` trivially atomic.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys (for test assertions).
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys with the given prefix (for test assertions).
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn put_many(&self, entries: Vec<(String, Vec<u8>)>) -> Result<()> {
        let mut map = self.entries.lock().unwrap();
        for (key, value) in entries {
            map.insert(key, value);
        }
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool> {
        let mut map = self.entries.lock().unwrap();
        if map.contains_key(key) {
            return Ok(false);
        }
        map.insert(key.to_string(), value);
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// PgStorage (production, postgres)
// ---------------------------------------------------------------------------

/// Durable storage on a single Postgres key-value table.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing table if it does not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS identity_kv (
                 key TEXT PRIMARY KEY,
                 value BYTEA NOT NULL,
                 updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
             )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT value FROM identity_kv WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<Vec<u8>, _>("value")))
    }

    async fn put_many(&self, entries: Vec<(String, Vec<u8>)>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in entries {
            sqlx::query(
                "INSERT INTO identity_kv (key, value) VALUES ($1, $2)
                 ON CONFLICT (key) DO UPDATE
                 SET value = EXCLUDED.value, updated_at = now()",
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO identity_kv (key, value) VALUES ($1, $2)
             ON CONFLICT (key) DO NOTHING",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
