//! Memory-based realtime store for Haven.
//!
//! This crate provides an in-memory implementation of the
//! [`RealtimeStore`] trait. It is non-persistent and cleared when the
//! process exits, which makes it the store of choice for tests and for
//! ephemeral tooling; production deployments point the chat engine at a
//! managed remote store instead.
//!
//! The implementation holds the whole store as one JSON tree behind a
//! [`parking_lot::RwLock`]. Subscription callbacks are dispatched after the
//! lock is released, so a callback may itself call back into the store.
//!
//! Server-timestamp sentinels are resolved against a strictly increasing
//! millisecond clock: two writes landing in the same wall-clock millisecond
//! still receive distinct, ordered timestamps.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use std::collections::HashMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use haven_storage_traits::{
    Backend, RealtimeStore, Snapshot, StorageError, StorePath, SubscriptionCallback,
    SubscriptionToken,
};
use parking_lot::RwLock;
use serde_json::{Map, Value};

mod tree;

struct Registration {
    path: StorePath,
    callback: SubscriptionCallback,
}

struct Inner {
    tree: Value,
    subscriptions: HashMap<u64, Registration>,
    next_token: u64,
    next_push_key: u64,
    last_timestamp_ms: u64,
}

impl Inner {
    /// Next server timestamp in unix ms, strictly greater than any
    /// previously issued by this store instance.
    fn next_timestamp_ms(&mut self) -> u64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let next = wall.max(self.last_timestamp_ms + 1);
        self.last_timestamp_ms = next;
        next
    }

    /// Collect the callbacks affected by a write at `path`, together with
    /// the snapshot each should be delivered. A subscriber fires when the
    /// write lands at, under, or above its subscribed path.
    fn affected(&self, path: &StorePath) -> Vec<(SubscriptionCallback, Snapshot)> {
        self.subscriptions
            .values()
            .filter(|reg| reg.path.starts_with(path) || path.starts_with(&reg.path))
            .map(|reg| (reg.callback.clone(), self.snapshot_at(&reg.path)))
            .collect()
    }

    fn snapshot_at(&self, path: &StorePath) -> Snapshot {
        tree::node(&self.tree, path.segments())
            .filter(|value| !value.is_null())
            .cloned()
    }
}

/// In-memory [`RealtimeStore`] backend.
///
/// # Example
///
/// ```rust
/// use haven_memory_storage::MemoryStore;
/// use haven_storage_traits::{Backend, RealtimeStore};
///
/// let store = MemoryStore::new();
/// assert_eq!(store.backend(), Backend::Memory);
/// ```
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                tree: Value::Null,
                subscriptions: HashMap::new(),
                next_token: 0,
                next_push_key: 0,
                last_timestamp_ms: 0,
            }),
        }
    }

    /// Number of live subscriptions, for leak assertions in tests
    pub fn subscription_count(&self) -> usize {
        self.inner.read().subscriptions.len()
    }

    fn dispatch(batch: Vec<(SubscriptionCallback, Snapshot)>) {
        for (callback, snapshot) in batch {
            callback(snapshot);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("MemoryStore")
            .field("subscriptions", &inner.subscriptions.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    fn backend(&self) -> Backend {
        Backend::Memory
    }

    async fn read(&self, path: &StorePath) -> Result<Snapshot, StorageError> {
        Ok(self.inner.read().snapshot_at(path))
    }

    async fn write(&self, path: &StorePath, mut value: Value) -> Result<(), StorageError> {
        let batch = {
            let mut inner = self.inner.write();
            let now = inner.next_timestamp_ms();
            tree::resolve_server_values(&mut value, now);
            tree::write_at(&mut inner.tree, path.segments(), value);
            inner.affected(path)
        };
        Self::dispatch(batch);
        Ok(())
    }

    async fn update(
        &self,
        path: &StorePath,
        entries: Map<String, Value>,
    ) -> Result<(), StorageError> {
        let batch = {
            let mut inner = self.inner.write();
            let now = inner.next_timestamp_ms();
            for (key, mut value) in entries {
                if key.is_empty() || key.contains('/') {
                    return Err(StorageError::InvalidPath(format!(
                        "invalid update key {key:?}"
                    )));
                }
                tree::resolve_server_values(&mut value, now);
                let child = path.clone().child(&key);
                tree::write_at(&mut inner.tree, child.segments(), value);
            }
            inner.affected(path)
        };
        Self::dispatch(batch);
        Ok(())
    }

    async fn push_unique_child(&self, _path: &StorePath) -> Result<String, StorageError> {
        let mut inner = self.inner.write();
        let serial = inner.next_push_key;
        inner.next_push_key += 1;
        // Zero-padded hex keeps key order equal to generation order
        Ok(format!("k{serial:016x}"))
    }

    async fn subscribe(
        &self,
        path: &StorePath,
        callback: SubscriptionCallback,
    ) -> Result<SubscriptionToken, StorageError> {
        let (token, initial) = {
            let mut inner = self.inner.write();
            let token = inner.next_token;
            inner.next_token += 1;
            inner.subscriptions.insert(
                token,
                Registration {
                    path: path.clone(),
                    callback: callback.clone(),
                },
            );
            (SubscriptionToken::new(token), inner.snapshot_at(path))
        };
        callback(initial);
        Ok(token)
    }

    fn unsubscribe(&self, token: SubscriptionToken) {
        self.inner.write().subscriptions.remove(&token.raw());
    }
}
