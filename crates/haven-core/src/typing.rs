//! Ephemeral typing presence.
//!
//! Typing flags are unconditional last-write-wins booleans with no
//! persistence guarantee and no expiry: a client that terminates abnormally
//! while typing leaves its flag set until it next writes `false`.
//! Subscribers receive every member's current flag, including their own;
//! the presentation layer excludes the viewer from the rendered indicator.

use std::collections::BTreeSet;
use std::sync::Arc;

use haven_storage_traits::{RealtimeStore, Snapshot, SubscriptionCallback};
use serde_json::Value;

use crate::error::Error;
use crate::session::Subscription;
use crate::types::{GroupId, UserId};
use crate::{ChatEngine, paths};

/// Callback receiving the ids currently flagged as typing
pub type TypingHandler = Arc<dyn Fn(BTreeSet<UserId>) + Send + Sync>;

impl<Storage> ChatEngine<Storage>
where
    Storage: RealtimeStore + 'static,
{
    /// Publish the caller's typing flag for the group.
    ///
    /// Last write wins; there is no debouncing or expiry in this core.
    pub async fn set_typing(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        is_typing: bool,
    ) -> Result<(), Error> {
        self.ensure_member(group_id, user_id).await?;
        self.storage()
            .write(&paths::typing_user(group_id, user_id), Value::Bool(is_typing))
            .await?;
        Ok(())
    }

    /// Subscribe to the group's typing flags.
    ///
    /// The handler fires with the current set of typing user ids at
    /// registration and after every flag change.
    pub async fn subscribe_typing(
        &self,
        group_id: &GroupId,
        handler: TypingHandler,
    ) -> Result<Subscription, Error> {
        let callback: SubscriptionCallback =
            Arc::new(move |snapshot| handler(decode_flag_set(snapshot)));
        self.subscribe_path(&paths::typing(group_id), callback).await
    }
}

/// Decode a map-of-booleans subtree into the set of ids flagged true
pub(crate) fn decode_flag_set(snapshot: Snapshot) -> BTreeSet<UserId> {
    let Some(Value::Object(entries)) = snapshot else {
        return BTreeSet::new();
    };
    entries
        .into_iter()
        .filter(|(_, flag)| flag == &Value::Bool(true))
        .map(|(key, _)| UserId::new(key))
        .collect()
}
