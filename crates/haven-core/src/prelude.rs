//! Convenience re-exports for the common surface of the engine.
//!
//! ```rust,ignore
//! use haven_core::prelude::*;
//! ```

pub use crate::constant::{SYSTEM_SENDER_ID, SYSTEM_SENDER_NAME, TOMBSTONE_TEXT};
pub use crate::error::Error;
pub use crate::membership::RosterHandler;
pub use crate::messages::MessageHandler;
pub use crate::session::{ChatSession, SessionHandlers, SessionState, Subscription};
pub use crate::types::{Group, GroupId, Message, MessageId, Timestamp, UserId};
pub use crate::typing::TypingHandler;
pub use crate::unread::unread_count;
pub use crate::ChatEngine;

pub use haven_storage_traits::{Backend, RealtimeStore};
