//! Cache-aside layer for raw provider responses.
//!
//! The client caches the raw JSON value of each upstream call under
//! `steam:{operation}:{key}` with a fixed TTL, so differently-parameterized
//! transforms downstream reuse one entry instead of refetching.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn put(&self, key: &str, value: Value, ttl: Duration);
}

/// In-process cache with per-entry expiry. Expired entries are dropped
/// lazily on read.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Value, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value, expires_at));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn fresh_entries_hit() {
        let cache = MemoryCache::new();
        cache
            .put("steam:owned-games:1", json!({"game_count": 3}), Duration::from_secs(60))
            .await;
        assert_eq!(
            cache.get("steam:owned-games:1").await,
            Some(json!({"game_count": 3}))
        );
    }

    #[tokio::test]
    async fn expired_entries_miss() {
        let cache = MemoryCache::new();
        cache
            .put("steam:owned-games:1", json!({"game_count": 3}), Duration::ZERO)
            .await;
        assert_eq!(cache.get("steam:owned-games:1").await, None);
    }

    #[tokio::test]
    async fn unknown_keys_miss() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("steam:player-summary:none").await, None);
    }
}
