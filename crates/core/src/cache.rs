//! In-process TTL cache for query results.
//!
//! Entries are keyed by the canonical query signatures the request types
//! produce, so equivalent queries built in different field orders share an
//! entry. Writes are last-writer-wins; concurrent misses for the same key
//! may each compute, and the final write sticks.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default time-to-live for cached results.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Thread-safe map with per-entry expiry.
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Mutex::new(HashMap::new()) }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached value if present and not expired. An expired entry
    /// is treated as absent; it is dropped lazily on the next insert or is
    /// overwritten in place.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_at(key.into(), value, Instant::now());
    }

    /// Returns the cached value, or computes, stores, and returns it on a
    /// miss. Concurrent misses for the same key may each compute; the last
    /// write wins.
    pub fn get_or_compute(&self, key: impl Into<String>, compute: impl FnOnce() -> V) -> V {
        self.get_or_compute_at(key.into(), Instant::now(), compute)
    }

    /// Drops every entry immediately. The only way to shed entries before
    /// their TTL elapses, intended for callers that know the underlying
    /// data just changed.
    pub fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let entries = self.entries.lock().expect("cache lock poisoned");
        let entry = entries.get(key)?;
        if now.duration_since(entry.stored_at) >= self.ttl {
            return None;
        }
        Some(entry.value.clone())
    }

    fn get_or_compute_at(&self, key: String, now: Instant, compute: impl FnOnce() -> V) -> V {
        if let Some(hit) = self.get_at(&key, now) {
            return hit;
        }
        let value = compute();
        self.insert_at(key, value.clone(), now);
        value
    }

    fn insert_at(&self, key: String, value: V, now: Instant) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.retain(|_, entry| now.duration_since(entry.stored_at) < self.ttl);
        entries.insert(key, Entry { value, stored_at: now });
    }
}
