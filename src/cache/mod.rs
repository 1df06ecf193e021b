/// Read-through cache with TTL and fail-open fallback
///
/// Wraps an arbitrary async producer with get-or-compute-and-store semantics
/// against an injected key-value store. The cache is a pure optimization:
/// store failures are logged and counted, never propagated, and the manager
/// degrades to invoking the producer directly.
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::errors::GatewayResult;
use crate::logger::{self, LogTag};

pub mod store;

pub use store::{CacheStore, MemoryStore, RestKvStore, StoreError};

/// Envelope persisted in the backing store
///
/// An entry is valid while `now < stored_at + ttl_ms`; `ttl_ms <= 0` never
/// expires. Entries are replaced wholesale on refresh, never mutated.
#[derive(Serialize, Deserialize)]
struct StoredEntry {
    v: Value,
    stored_at: i64,
    ttl_ms: i64,
}

/// Cache counters for monitoring
///
/// Decode failures on stored values are counted separately from store
/// unavailability so the two degradation modes stay observable, even though
/// both fall back to recomputation.
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub store_errors: u64,
    pub decode_errors: u64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

enum Lookup<T> {
    Fresh(T),
    Expired,
    Corrupt,
}

/// Cache manager with an injected backing store
pub struct CacheManager {
    store: Arc<dyn CacheStore>,
    default_ttl_ms: i64,
    metrics: Mutex<CacheMetrics>,
}

impl CacheManager {
    pub fn new(store: Arc<dyn CacheStore>, default_ttl_ms: i64) -> Self {
        Self {
            store,
            default_ttl_ms,
            metrics: Mutex::new(CacheMetrics::default()),
        }
    }

    pub fn default_ttl_ms(&self) -> i64 {
        self.default_ttl_ms
    }

    /// Look up `key`, or invoke `compute` and persist its result
    ///
    /// `ttl_ms <= 0` caches forever until explicitly invalidated. Only
    /// `compute`'s own error ever reaches the caller; the store failing to
    /// read or write degrades to direct computation.
    ///
    /// Two concurrent callers that both miss will both invoke `compute` and
    /// both write, last write winning. This is an accepted limitation, not a
    /// coalescing layer.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &str,
        ttl_ms: i64,
        compute: F,
    ) -> GatewayResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        if key.is_empty() {
            logger::warning(LogTag::Cache, "empty cache key, computing directly");
            return compute().await;
        }

        match self.store.get(key).await {
            Ok(Some(raw)) => match self.decode_entry::<T>(&raw) {
                Lookup::Fresh(value) => {
                    self.bump(|m| m.hits += 1);
                    return Ok(value);
                }
                Lookup::Expired => {}
                Lookup::Corrupt => {
                    self.bump(|m| m.decode_errors += 1);
                    logger::warning(
                        LogTag::Cache,
                        &format!("undecodable entry for key '{}', recomputing", key),
                    );
                }
            },
            Ok(None) => {}
            Err(e) => {
                self.bump(|m| m.store_errors += 1);
                logger::warning(LogTag::Cache, &format!("store lookup failed: {}", e));
            }
        }

        self.bump(|m| m.misses += 1);
        let value = compute().await?;
        self.write_back(key, &value, ttl_ms).await;
        Ok(value)
    }

    /// Remove an entry; a no-op when absent, fail-open on store errors
    pub async fn invalidate(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            self.bump(|m| m.store_errors += 1);
            logger::warning(LogTag::Cache, &format!("invalidate of '{}' failed: {}", key, e));
        }
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.metrics.lock().unwrap().clone()
    }

    fn decode_entry<T: DeserializeOwned>(&self, raw: &str) -> Lookup<T> {
        let entry: StoredEntry = match serde_json::from_str(raw) {
            Ok(entry) => entry,
            Err(_) => return Lookup::Corrupt,
        };

        let fresh = entry.ttl_ms <= 0
            || chrono::Utc::now().timestamp_millis() < entry.stored_at + entry.ttl_ms;
        if !fresh {
            return Lookup::Expired;
        }

        match serde_json::from_value(entry.v) {
            Ok(value) => Lookup::Fresh(value),
            Err(_) => Lookup::Corrupt,
        }
    }

    async fn write_back<T: Serialize>(&self, key: &str, value: &T, ttl_ms: i64) {
        let entry = StoredEntry {
            v: match serde_json::to_value(value) {
                Ok(v) => v,
                Err(e) => {
                    self.bump(|m| m.decode_errors += 1);
                    logger::warning(LogTag::Cache, &format!("value not serializable: {}", e));
                    return;
                }
            },
            stored_at: chrono::Utc::now().timestamp_millis(),
            ttl_ms,
        };

        // Envelope carries the TTL for validity checks; the store also gets
        // it so stores with native expiry can evict on their own.
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                logger::warning(LogTag::Cache, &format!("entry not serializable: {}", e));
                return;
            }
        };

        match self.store.set(key, &raw, ttl_ms).await {
            Ok(()) => self.bump(|m| m.writes += 1),
            Err(e) => {
                self.bump(|m| m.store_errors += 1);
                logger::warning(LogTag::Cache, &format!("store write failed: {}", e));
            }
        }
    }

    fn bump(&self, update: impl FnOnce(&mut CacheMetrics)) {
        let mut metrics = self.metrics.lock().unwrap();
        update(&mut metrics);
    }
}
