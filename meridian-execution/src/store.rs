//! The `StateStore` capability (consumed), per spec.md §6.3.
//!
//! Out of scope per spec.md §1: "persistence substrates (key-value store,
//! relational store)". This module defines the key-value operations the
//! core needs (order queue mirror, broker-order-id mappings, position
//! snapshots, daily P&L counters, execution tracker snapshots) and ships an
//! in-memory reference implementation for tests and demos.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

/// All [`StateStore`] operations "may fail with a transient error that the
/// core retries with bounded backoff" (spec.md §6.3).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("transient store error: {0}")]
    Transient(String),
}

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn put(&self, key: &str, value: String) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;
    async fn hput(&self, key: &str, field: &str, value: String) -> Result<(), StoreError>;
    /// Atomically increments a hash field interpreted as an integer,
    /// returning the new value.
    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64, StoreError>;

    async fn list_push(&self, key: &str, value: String) -> Result<(), StoreError>;
    /// Trims the list at `key` to keep at most `max_len` most-recent
    /// entries (oldest evicted first).
    async fn list_trim(&self, key: &str, max_len: usize) -> Result<(), StoreError>;
    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError>;

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Marks `key` to expire after `ttl_secs` from now. The in-memory
    /// reference implementation treats this as a best-effort hint rather
    /// than enforcing eviction, since demos/tests run for seconds not days.
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct Inner {
    scalars: HashMap<String, String>,
    hashes: HashMap<String, HashMap<String, String>>,
    lists: HashMap<String, Vec<String>>,
    ttls: HashMap<String, u64>,
}

/// In-memory [`StateStore`] reference implementation. Not durable across
/// process restarts — intended for tests and the `demos` crate only.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    inner: Mutex<Inner>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.lock().scalars.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.inner.lock().scalars.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.scalars.remove(key);
        inner.hashes.remove(key);
        inner.lists.remove(key);
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .inner
            .lock()
            .hashes
            .get(key)
            .and_then(|h| h.get(field))
            .cloned())
    }

    async fn hput(&self, key: &str, field: &str, value: String) -> Result<(), StoreError> {
        self.inner
            .lock()
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value);
        Ok(())
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock();
        let hash = inner.hashes.entry(key.to_string()).or_default();
        let current: i64 = hash
            .get(field)
            .map(|v| v.parse().unwrap_or(0))
            .unwrap_or(0);
        let next = current + delta;
        hash.insert(field.to_string(), next.to_string());
        Ok(next)
    }

    async fn list_push(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.inner.lock().lists.entry(key.to_string()).or_default().push(value);
        Ok(())
    }

    async fn list_trim(&self, key: &str, max_len: usize) -> Result<(), StoreError> {
        if let Some(list) = self.inner.lock().lists.get_mut(key) {
            let excess = list.len().saturating_sub(max_len);
            if excess > 0 {
                list.drain(0..excess);
            }
        }
        Ok(())
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.inner.lock().lists.get(key).cloned().unwrap_or_default())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock();
        let mut keys: Vec<String> = inner
            .scalars
            .keys()
            .chain(inner.hashes.keys())
            .chain(inner.lists.keys())
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), StoreError> {
        self.inner.lock().ttls.insert(key.to_string(), ttl_secs);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scalar_roundtrip() {
        let store = InMemoryStateStore::new();
        store.put("order:1", "pending".into()).await.unwrap();
        assert_eq!(store.get("order:1").await.unwrap(), Some("pending".into()));
        store.delete("order:1").await.unwrap();
        assert_eq!(store.get("order:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_trim_keeps_most_recent() {
        let store = InMemoryStateStore::new();
        for i in 0..5 {
            store.list_push("signals:s1", i.to_string()).await.unwrap();
        }
        store.list_trim("signals:s1", 3).await.unwrap();
        assert_eq!(
            store.list_range("signals:s1").await.unwrap(),
            vec!["2", "3", "4"]
        );
    }

    #[tokio::test]
    async fn scan_prefix_matches_across_kinds() {
        let store = InMemoryStateStore::new();
        store.put("pending:1", "x".into()).await.unwrap();
        store.hput("pending:2", "f", "v".into()).await.unwrap();
        store.put("processing:1", "y".into()).await.unwrap();

        let mut keys = store.scan_prefix("pending:").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["pending:1", "pending:2"]);
    }
}
