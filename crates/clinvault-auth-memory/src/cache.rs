//! In-memory ad-hoc cache.

use dashmap::DashMap;
use serde_json::Value;

use clinvault_auth::AdhocCache;

/// Concurrent key-value cache over a [`DashMap`].
#[derive(Default)]
pub struct MemoryAdhocCache {
    entries: DashMap<String, Value>,
}

impl MemoryAdhocCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AdhocCache for MemoryAdhocCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn put(&self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}
