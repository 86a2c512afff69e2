// src/domain/store.rs

//! Store domain abstraction.
//!
//! The durable store is a hierarchical key/value tree addressed by
//! slash-separated paths (`temp/<pushKey>`, `live/temp`, `fanStatus`).
//! The bridge consumes it through exactly four operations: ordered append,
//! point write, point read, and subtree listing. Retention, replication,
//! and retry policy are the store's concern, not this crate's.
//!
//! The in-memory implementation under `src/store/` provides the reference
//! semantics used by the tests.

use crate::Result;
use std::sync::Arc;

use serde_json::Value;

/// Hierarchical key/value store abstraction.
///
/// Implementations must ensure that:
/// - `push()` assigns a child key that is unique and sorts after every key
///   previously assigned under the same path (insertion order is
///   recoverable from key order).
/// - `set()` is last-write-wins with no read-modify-write cycle.
/// - `children()` returns direct children in ascending key order.
///
/// No transaction isolation is promised: a reader may observe a log entry
/// before the matching live-slot write lands. That is acceptable for a
/// monitoring workload.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // ---

    /// Append `value` under a fresh, order-preserving child key of `path`.
    /// Returns the assigned key. Never overwrites an existing entry.
    async fn push(&self, path: &str, value: Value) -> Result<String>;

    /// Write `value` at exactly `path`, replacing any previous value.
    async fn set(&self, path: &str, value: Value) -> Result<()>;

    /// Read the value at exactly `path`, if any.
    async fn get(&self, path: &str) -> Result<Option<Value>>;

    /// List the direct children of `path` as `(key, value)` pairs in
    /// ascending key order. An unknown path yields an empty list.
    async fn children(&self, path: &str) -> Result<Vec<(String, Value)>>;
}

/// Shared store pointer, cheap to clone and safe to share between the
/// subscriber loop and the HTTP handlers.
pub type StorePtr = Arc<dyn Store>;
