//! Fixed wire literals shared across the engine

/// Replacement text left in place of a soft-deleted message's body
pub const TOMBSTONE_TEXT: &str = "Message deleted";

/// Sender id carried by engine-authored announcements (join messages)
pub const SYSTEM_SENDER_ID: &str = "system";

/// Display name attached to engine-authored announcements
pub const SYSTEM_SENDER_NAME: &str = "System";
