//! Core data model: groups, messages, ids and timestamps.
//!
//! These types mirror the path schema the engine reads and writes:
//!
//! ```text
//! groups/{groupId}/name                            : string
//! groups/{groupId}/description                     : string
//! groups/{groupId}/createdAt                       : timestamp
//! groups/{groupId}/createdBy                       : userId
//! groups/{groupId}/members/{userId}                : true
//! groups/{groupId}/messages/{messageId}/...        : see [`Message`]
//! groups/{groupId}/typing/{userId}                 : boolean
//! ```
//!
//! Ids are the map keys of their parent node, so the id fields here are
//! `#[serde(skip)]` and filled in by the `from_snapshot` constructors.
//! Membership and read markers are maps to `true`, the set encoding the
//! store natively holds.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Opaque, store-assigned group id
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GroupId(String);

/// Opaque user id assigned by the identity layer
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(String);

/// Opaque, store-assigned message id, unique within its group
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MessageId(String);

macro_rules! impl_id {
    ($name:ident) => {
        impl $name {
            /// Wrap a raw id string
            pub fn new<T>(raw: T) -> Self
            where
                T: Into<String>,
            {
                Self(raw.into())
            }

            /// The raw id string
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }
    };
}

impl_id!(GroupId);
impl_id!(UserId);
impl_id!(MessageId);

/// Server-assigned instant in unix milliseconds
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Wrap a unix-millisecond value
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// The value in unix milliseconds
    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One message in a group's append-only log.
///
/// Sender display names are denormalized at send time and never updated
/// retroactively. A soft-deleted message keeps its `id` and `timestamp`
/// forever; only `text` (replaced by the tombstone) and `deleted_at` change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The message id (the key of the message node, not stored inside it)
    #[serde(skip)]
    pub id: MessageId,
    /// Message body, or the tombstone text once deleted
    pub text: String,
    /// Sender's user id; `"system"` for engine-authored announcements
    #[serde(rename = "userId")]
    pub sender_id: UserId,
    /// Sender's display name as of send time
    #[serde(rename = "userName")]
    pub sender_name: String,
    /// Server-assigned send time, strictly increasing in append order
    pub timestamp: Timestamp,
    /// Message this one replies to; may reference a later-deleted message
    #[serde(rename = "replyTo", default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<MessageId>,
    /// Set when the message was soft-deleted
    #[serde(rename = "deletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
    /// Users who have observed the message, as the store's map-to-true set
    #[serde(rename = "readBy", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub read_by: BTreeMap<UserId, bool>,
}

impl Message {
    /// Rebuild a message from its store node and the map key it sits under
    pub fn from_snapshot(id: MessageId, value: Value) -> Result<Self, Error> {
        let mut message: Self = serde_json::from_value(value)?;
        message.id = id;
        Ok(message)
    }

    /// Whether the message has been soft-deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether `user_id` carries a read marker for this message
    pub fn is_read_by(&self, user_id: &UserId) -> bool {
        self.read_by.get(user_id).copied().unwrap_or(false)
    }

    /// Compares two messages for display ordering.
    ///
    /// The primary key is the store-assigned `timestamp`; the id breaks the
    /// (theoretical) tie deterministically. Returns [`Ordering::Greater`]
    /// if `self` was appended after `other`. Viewers render newest-first,
    /// so list builders call this with the arguments swapped.
    pub fn append_order_cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// A named conversation with a membership set and an append-only log.
///
/// The ephemeral `typing` subtree is deliberately not part of this type:
/// presence has no persistence guarantee and is consumed only through the
/// typing subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// The group id (the key of the group node, not stored inside it)
    #[serde(skip)]
    pub id: GroupId,
    /// Group name
    pub name: String,
    /// Group description
    pub description: String,
    /// Server-assigned creation time
    #[serde(rename = "createdAt")]
    pub created_at: Timestamp,
    /// Creator's user id; always present in `members`
    #[serde(rename = "createdBy")]
    pub created_by: UserId,
    /// Membership set as the store's map-to-true encoding
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub members: BTreeMap<UserId, bool>,
    /// The message log, keyed by message id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub messages: BTreeMap<MessageId, Message>,
}

impl Group {
    /// Rebuild a group from its store node and the map key it sits under.
    ///
    /// Fills in the group id and every nested message id from their keys.
    pub fn from_snapshot(id: GroupId, value: Value) -> Result<Self, Error> {
        let mut group: Self = serde_json::from_value(value)?;
        group.id = id;
        for (message_id, message) in group.messages.iter_mut() {
            message.id = message_id.clone();
        }
        Ok(group)
    }

    /// Whether `user_id` is a member
    pub fn is_member(&self, user_id: &UserId) -> bool {
        self.members.get(user_id).copied().unwrap_or(false)
    }

    /// The message log, newest first
    pub fn messages_newest_first(&self) -> Vec<Message> {
        let mut messages: Vec<Message> = self.messages.values().cloned().collect();
        messages.sort_by(|a, b| b.append_order_cmp(a));
        messages
    }
}
