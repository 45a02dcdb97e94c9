//! Bounded TTL cache of successful primary responses.

use lru::LruCache;
use parking_lot::Mutex;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;

/// Cache key: service plus request key.
pub type CacheKey = (String, String);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Least-recently-used response cache with per-entry expiry.
///
/// Expired entries are treated as absent and removed on lookup.
pub struct ResponseCache {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Fresh value for `service`/`key`, if any.
    pub fn get(&self, service: &str, key: &str) -> Option<Value> {
        let cache_key = (service.to_string(), key.to_string());
        let mut entries = self.entries.lock();
        match entries.get(&cache_key) {
            Some(entry) if entry.is_fresh(Instant::now()) => Some(entry.value.clone()),
            Some(_) => {
                entries.pop(&cache_key);
                None
            }
            None => None,
        }
    }

    /// Store `value`, replacing any previous entry for the key.
    pub fn insert(&self, service: &str, key: &str, value: Value, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries
            .lock()
            .put((service.to_string(), key.to_string()), entry);
    }

    /// Drop every entry belonging to `service`.
    pub fn invalidate_service(&self, service: &str) -> usize {
        let mut entries = self.entries.lock();
        let keys: Vec<CacheKey> = entries
            .iter()
            .filter(|(key, _)| key.0 == service)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            entries.pop(key);
        }
        keys.len()
    }

    /// Remove expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let expired: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_fresh(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Entries held, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("ResponseCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}
