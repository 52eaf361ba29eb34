//! Haven storage - the realtime store contract consumed by the Haven chat engine.
//!
//! The chat engine runs against a path-addressable realtime store: a JSON
//! tree supporting point reads, unconditional and merge writes, unique child
//! key generation, and live subscriptions to subtree changes. This crate
//! defines that contract ([`RealtimeStore`]) without implementing it, so the
//! engine can be driven by a managed remote store in production and by an
//! in-memory fake in tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

pub mod error;
pub mod path;

pub use error::StorageError;
pub use path::StorePath;

/// Key marking a JSON object as a server-value sentinel
pub const SERVER_VALUE_KEY: &str = ".sv";

/// Write-time sentinel resolved to the store's clock at commit.
///
/// Backends replace any node equal to this value with the current server
/// time in unix milliseconds when the write is applied.
pub fn server_timestamp() -> Value {
    json!({ SERVER_VALUE_KEY: "timestamp" })
}

/// Whether a value is the server-timestamp sentinel
pub fn is_server_timestamp(value: &Value) -> bool {
    match value.as_object() {
        Some(map) => {
            map.len() == 1 && map.get(SERVER_VALUE_KEY).and_then(Value::as_str) == Some("timestamp")
        }
        None => false,
    }
}

/// The value currently held at a path; `None` means the path does not exist.
///
/// Absent paths and paths holding `null` are indistinguishable: writing
/// `null` deletes a node.
pub type Snapshot = Option<Value>;

/// Callback invoked with the current snapshot of a subscribed path
pub type SubscriptionCallback = Arc<dyn Fn(Snapshot) + Send + Sync>;

/// Handle identifying one live subscription, used to cancel it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

impl SubscriptionToken {
    /// Create a token from a backend-assigned id
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The backend-assigned id
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// In-memory store, lost on process exit
    Memory,
    /// Managed remote store
    Remote,
}

impl Backend {
    /// Check if it's a persistent backend
    ///
    /// All values different from [`Backend::Memory`] are considered persistent
    pub fn is_persistent(&self) -> bool {
        !matches!(self, Self::Memory)
    }
}

/// A path-addressable realtime store.
///
/// Writes to a single path are linearized by the store; no consistency is
/// guaranteed across paths. All operations that touch the store are
/// asynchronous and may suspend the caller, except [`unsubscribe`], which
/// must take effect synchronously so callers can release streams from
/// non-async contexts (e.g. `Drop`).
///
/// [`unsubscribe`]: RealtimeStore::unsubscribe
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Returns the backend type
    fn backend(&self) -> Backend;

    /// One-shot snapshot read of the subtree at `path`
    async fn read(&self, path: &StorePath) -> Result<Snapshot, StorageError>;

    /// Unconditionally overwrite the subtree at `path`.
    ///
    /// Server-value sentinels anywhere in `value` are resolved at commit.
    /// Writing `Value::Null` deletes the node.
    async fn write(&self, path: &StorePath, value: Value) -> Result<(), StorageError>;

    /// Shallow-merge `entries` into the object at `path`.
    ///
    /// Each entry overwrites the child of the same name; children not named
    /// in `entries` are untouched. A `Value::Null` entry deletes that child.
    async fn update(&self, path: &StorePath, entries: Map<String, Value>)
    -> Result<(), StorageError>;

    /// Generate a unique child key under `path` without writing anything.
    ///
    /// Keys generated by one store instance are lexicographically increasing,
    /// so key order reflects generation order.
    async fn push_unique_child(&self, path: &StorePath) -> Result<String, StorageError>;

    /// Register a live callback for the subtree at `path`.
    ///
    /// The callback fires once with the current snapshot at registration,
    /// then again after every write at, under, or above `path`. Snapshots
    /// are not an incremental diff stream: consumers re-derive their state
    /// from each delivered snapshot.
    async fn subscribe(
        &self,
        path: &StorePath,
        callback: SubscriptionCallback,
    ) -> Result<SubscriptionToken, StorageError>;

    /// Cancel a live subscription.
    ///
    /// Takes effect synchronously; unknown or already-cancelled tokens are
    /// ignored.
    fn unsubscribe(&self, token: SubscriptionToken);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_is_persistent() {
        assert!(!Backend::Memory.is_persistent());
        assert!(Backend::Remote.is_persistent());
    }

    #[test]
    fn test_server_timestamp_sentinel() {
        let sentinel = server_timestamp();
        assert!(is_server_timestamp(&sentinel));

        assert!(!is_server_timestamp(&json!(12345)));
        assert!(!is_server_timestamp(&json!({ ".sv": "other" })));
        assert!(!is_server_timestamp(
            &json!({ ".sv": "timestamp", "extra": 1 })
        ));
    }

    #[test]
    fn test_subscription_token_raw() {
        let token = SubscriptionToken::new(42);
        assert_eq!(token.raw(), 42);
        assert_eq!(token, SubscriptionToken::new(42));
    }
}
