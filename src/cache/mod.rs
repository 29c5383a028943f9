// src/cache/mod.rs
// Fingerprint-keyed response cache. Caching is a performance optimization,
// never a correctness dependency: the pipeline treats every failure here as
// a miss and moves on.

pub mod fingerprint;

pub use fingerprint::fingerprint;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::config::CONFIG;
use crate::formatter::response::FormattedResponse;

/// Cache seam consumed by the pipeline. Implementations must be safe for
/// concurrent in-flight requests and must never block on the generation
/// backend.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<FormattedResponse>>;

    async fn set(&self, key: &str, value: FormattedResponse, ttl_seconds: u64) -> Result<()>;
}

/// Hit/miss accounting for the in-memory cache.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

#[derive(Clone)]
struct CacheEntry {
    response: FormattedResponse,
    stored_at: Instant,
    expires_at: Instant,
}

/// Thread-safe in-memory response cache with per-entry TTL and a bounded
/// entry count (oldest entry evicted at capacity). Expired entries answer
/// as misses and are swept on write.
pub struct InMemoryResponseCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl InMemoryResponseCache {
    pub fn new() -> Self {
        Self::with_capacity(CONFIG.cache_max_entries)
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read().map(|m| m.len()).unwrap_or(0);
        CacheStats {
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Drop every expired entry. Called on write; also usable directly from
    /// a periodic sweep task.
    pub fn sweep_expired(&self) {
        let now = Instant::now();
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, entry| entry.expires_at > now);
        }
    }
}

impl Default for InMemoryResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn get(&self, key: &str) -> Result<Option<FormattedResponse>> {
        let found = {
            let entries = self
                .entries
                .read()
                .map_err(|_| anyhow::anyhow!("cache lock poisoned"))?;
            entries.get(key).and_then(|entry| {
                if entry.expires_at > Instant::now() {
                    Some(entry.response.clone())
                } else {
                    None
                }
            })
        };

        match found {
            Some(response) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(response))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: FormattedResponse, ttl_seconds: u64) -> Result<()> {
        let now = Instant::now();
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow::anyhow!("cache lock poisoned"))?;

        entries.retain(|_, entry| entry.expires_at > now);

        // Evict the oldest entry once at capacity
        if entries.len() >= self.max_entries && !entries.contains_key(key) {
            if let Some(oldest_key) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest_key);
            }
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                response: value,
                stored_at: now,
                expires_at: now + Duration::from_secs(ttl_seconds),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ResponseStyle;
    use crate::formatter::response::GenerationMetrics;
    use chrono::Utc;

    fn response(content: &str) -> FormattedResponse {
        FormattedResponse {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.to_string(),
            style: ResponseStyle::Conversational,
            metrics: GenerationMetrics::default(),
            quality_score: 0.6,
            fallback_used: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_roundtrip_before_ttl() {
        let cache = InMemoryResponseCache::with_capacity(10);
        cache.set("fp-1", response("Email sent."), 60).await.unwrap();

        let hit = cache.get("fp-1").await.unwrap().unwrap();
        assert_eq!(hit.content, "Email sent.");
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = InMemoryResponseCache::with_capacity(10);
        cache.set("fp-1", response("stale"), 0).await.unwrap();

        assert!(cache.get("fp-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_key_is_a_miss() {
        let cache = InMemoryResponseCache::with_capacity(10);
        assert!(cache.get("never-written").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let cache = InMemoryResponseCache::with_capacity(2);
        cache.set("fp-1", response("one"), 60).await.unwrap();
        // Distinct stored_at ordering
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.set("fp-2", response("two"), 60).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.set("fp-3", response("three"), 60).await.unwrap();

        assert!(cache.get("fp-1").await.unwrap().is_none());
        assert!(cache.get("fp-2").await.unwrap().is_some());
        assert!(cache.get("fp-3").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stats_count_hits_and_misses() {
        let cache = InMemoryResponseCache::with_capacity(10);
        cache.set("fp-1", response("one"), 60).await.unwrap();

        cache.get("fp-1").await.unwrap();
        cache.get("fp-1").await.unwrap();
        cache.get("missing").await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_entries() {
        let cache = InMemoryResponseCache::with_capacity(10);
        cache.set("fp-1", response("stale"), 0).await.unwrap();
        cache.set("fp-2", response("fresh"), 60).await.unwrap();

        cache.sweep_expired();
        assert_eq!(cache.stats().entries, 1);
    }
}
