//! Per-user unread tracking.
//!
//! Unread counts are never stored: they are derived from per-message read
//! markers on every group-list refresh. Marking a message read is a
//! set-union write and is idempotent.

use haven_storage_traits::RealtimeStore;
use serde_json::Value;

use crate::error::Error;
use crate::types::{Group, GroupId, MessageId, UserId};
use crate::{ChatEngine, paths};

/// The number of messages in the group that `user_id` has not observed.
///
/// Pure function over a group snapshot; tombstoned messages still count
/// until the user marks them read.
pub fn unread_count(group: &Group, user_id: &UserId) -> usize {
    group
        .messages
        .values()
        .filter(|message| !message.is_read_by(user_id))
        .count()
}

impl<Storage> ChatEngine<Storage>
where
    Storage: RealtimeStore + 'static,
{
    /// Add the user's read marker to a message. Idempotent set-union write.
    pub async fn mark_read(
        &self,
        group_id: &GroupId,
        message_id: &MessageId,
        user_id: &UserId,
    ) -> Result<(), Error> {
        self.ensure_member(group_id, user_id).await?;
        self.storage()
            .write(
                &paths::read_marker(group_id, message_id, user_id),
                Value::Bool(true),
            )
            .await?;
        Ok(())
    }
}
