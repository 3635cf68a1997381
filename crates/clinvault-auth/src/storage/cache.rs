//! Ad-hoc cache trait.
//!
//! A simple get/put/remove key-value cache used by the policy information
//! service for policy lookups. Reads tolerate staleness; entries are
//! explicitly invalidated on mutation rather than only time-expired.

use serde_json::Value;

/// Key-value cache for serialized security-core data.
pub trait AdhocCache: Send + Sync {
    /// Returns the cached value for the key, if present.
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores a value under the key, replacing any existing entry.
    fn put(&self, key: &str, value: Value);

    /// Removes the entry for the key, if present.
    fn remove(&self, key: &str);
}
