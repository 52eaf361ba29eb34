//! Support-group chat engine for the Haven wellness app.
//!
//! This crate implements the one genuinely concurrent subsystem of the app:
//! group discovery and join, an append-only message log shared by many
//! simultaneously connected clients, ephemeral typing presence, reply
//! threading, soft deletion, and per-user unread tracking. Everything runs
//! against a path-addressable realtime store described by the
//! [`RealtimeStore`] trait, so the engine is testable against an in-memory
//! fake and deployable against a managed remote store unchanged.
//!
//! The engine performs no retries: a failed append, join or delete is
//! surfaced to the caller, who decides whether to try again. Writes are
//! unconditional last-write-wins or set-union, which is safe for the write
//! shapes used here (booleans, appends, set-union) and relies on the store
//! linearizing writes per path.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use std::sync::Arc;

use haven_storage_traits::RealtimeStore;

mod constant;
pub mod error;
mod groups;
mod membership;
mod messages;
mod paths;
pub mod prelude;
pub mod session;
#[cfg(test)]
mod test_util;
mod typing;
pub mod types;
pub mod unread;

pub use constant::{SYSTEM_SENDER_ID, SYSTEM_SENDER_NAME, TOMBSTONE_TEXT};
pub use error::Error;
pub use membership::RosterHandler;
pub use messages::MessageHandler;
pub use session::{ChatSession, SessionHandlers, SessionState, Subscription};
pub use typing::TypingHandler;

/// The main struct for the Haven chat engine.
///
/// One engine instance serves one authenticated client. It is a cheap
/// handle over a shared storage connection: cloning it clones the handle,
/// not the store. All conversation state lives in the store; the engine
/// holds no caches, so concurrent clients coordinate purely through the
/// store's per-path linearization.
pub struct ChatEngine<Storage>
where
    Storage: RealtimeStore,
{
    storage: Arc<Storage>,
}

impl<Storage> ChatEngine<Storage>
where
    Storage: RealtimeStore + 'static,
{
    /// Construct an engine over the given store
    pub fn new(storage: Storage) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    /// Construct an engine sharing an already-wrapped store handle
    pub fn with_shared_storage(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub(crate) fn storage(&self) -> &Storage {
        &self.storage
    }

    pub(crate) fn storage_handle(&self) -> Arc<Storage> {
        Arc::clone(&self.storage)
    }
}

impl<Storage> Clone for ChatEngine<Storage>
where
    Storage: RealtimeStore,
{
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<Storage> std::fmt::Debug for ChatEngine<Storage>
where
    Storage: RealtimeStore,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatEngine")
            .field("backend", &self.storage.backend())
            .finish()
    }
}
