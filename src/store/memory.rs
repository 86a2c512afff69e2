// src/store/memory.rs

//! In-memory hierarchical store.
//!
//! The **reference implementation** of the `Store` contract: a flat ordered
//! map of full slash paths to JSON values. Hierarchy is implicit in the
//! path strings, which is all the bridge needs (one level of children per
//! channel log).
//!
//! Push keys come from a process-local atomic counter, zero-padded so that
//! lexicographic key order equals append order. That satisfies the ordered
//! append contract without global uniqueness machinery.
//!
//! ## Non-Goals
//!
//! - Durability across restarts
//! - Transactions or multi-key atomicity
//! - Path-level access control

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::{Result, Store, StorePtr};

struct MemoryStore {
    // ---
    entries: RwLock<BTreeMap<String, Value>>,
    push_counter: AtomicU64,
}

impl MemoryStore {
    /// Next ordered push key. 20 digits covers the full u64 range, so the
    /// zero-padding never breaks lexicographic ordering.
    fn next_push_key(&self) -> String {
        let n = self.push_counter.fetch_add(1, Ordering::Relaxed);
        format!("{n:020}")
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    // ---

    async fn push(&self, path: &str, value: Value) -> Result<String> {
        // ---
        let key = self.next_push_key();
        let full = format!("{path}/{key}");

        let mut entries = self.entries.write().await;
        entries.insert(full, value);

        Ok(key)
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        // ---
        let mut entries = self.entries.write().await;
        entries.insert(path.to_string(), value);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Value>> {
        // ---
        let entries = self.entries.read().await;
        Ok(entries.get(path).cloned())
    }

    async fn children(&self, path: &str) -> Result<Vec<(String, Value)>> {
        // ---
        let prefix = format!("{path}/");

        let entries = self.entries.read().await;
        let children = entries
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            // Direct children only; deeper descendants keep a '/' in the
            // remainder of their path.
            .filter(|(k, _)| !k[prefix.len()..].contains('/'))
            .map(|(k, v)| (k[prefix.len()..].to_string(), v.clone()))
            .collect();

        Ok(children)
    }
}

/// Create a new empty in-memory store.
pub async fn create_memory_store() -> Result<StorePtr> {
    // ---
    let store = MemoryStore {
        entries: RwLock::new(BTreeMap::new()),
        push_counter: AtomicU64::new(0),
    };

    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn push_keys_preserve_append_order() {
        // ---
        let store = create_memory_store().await.unwrap();

        store.push("temp", json!({"n": 1})).await.unwrap();
        store.push("temp", json!({"n": 2})).await.unwrap();
        store.push("temp", json!({"n": 3})).await.unwrap();

        let children = store.children("temp").await.unwrap();
        let ns: Vec<i64> = children.iter().map(|(_, v)| v["n"].as_i64().unwrap()).collect();

        assert_eq!(ns, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn push_never_overwrites() {
        // ---
        let store = create_memory_store().await.unwrap();

        let k1 = store.push("temp", json!(1)).await.unwrap();
        let k2 = store.push("temp", json!(2)).await.unwrap();

        assert_ne!(k1, k2);
        assert_eq!(store.children("temp").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn set_is_last_write_wins() {
        // ---
        let store = create_memory_store().await.unwrap();

        store.set("live/temp", json!(20.0)).await.unwrap();
        store.set("live/temp", json!(21.5)).await.unwrap();

        assert_eq!(store.get("live/temp").await.unwrap(), Some(json!(21.5)));
    }

    #[tokio::test]
    async fn children_are_scoped_to_the_path() {
        // ---
        let store = create_memory_store().await.unwrap();

        store.push("temp", json!(1)).await.unwrap();
        store.push("tempout", json!(2)).await.unwrap();
        store.set("live/temp", json!(3)).await.unwrap();

        let children = store.children("temp").await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].1, json!(1));
    }

    #[tokio::test]
    async fn unknown_paths_are_empty_not_errors() {
        // ---
        let store = create_memory_store().await.unwrap();

        assert!(store.children("co2").await.unwrap().is_empty());
        assert_eq!(store.get("co2").await.unwrap(), None);
    }
}
