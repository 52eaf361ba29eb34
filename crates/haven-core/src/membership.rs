//! Membership checks and the live roster subscription.
//!
//! Membership is a boolean-valued map monotonically set to true; this core
//! exposes no remove operation. Every write operation in the engine guards
//! on membership through [`ChatEngine::is_member`] and rejects non-members
//! with a permission error.

use std::collections::BTreeSet;
use std::sync::Arc;

use haven_storage_traits::{RealtimeStore, SubscriptionCallback};
use serde_json::Value;

use crate::error::Error;
use crate::session::Subscription;
use crate::types::{GroupId, UserId};
use crate::typing::decode_flag_set;
use crate::{ChatEngine, paths};

/// Callback receiving the group's current member id set.
///
/// Display names are not part of the roster: sender names are denormalized
/// onto messages at send time.
pub type RosterHandler = Arc<dyn Fn(BTreeSet<UserId>) + Send + Sync>;

impl<Storage> ChatEngine<Storage>
where
    Storage: RealtimeStore + 'static,
{
    /// Whether `user_id` is a member of the group, as a single point read
    pub async fn is_member(&self, group_id: &GroupId, user_id: &UserId) -> Result<bool, Error> {
        let snapshot = self
            .storage()
            .read(&paths::member(group_id, user_id))
            .await?;
        Ok(matches!(snapshot, Some(Value::Bool(true))))
    }

    /// Membership guard used by every write operation
    pub(crate) async fn ensure_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<(), Error> {
        if self.is_member(group_id, user_id).await? {
            Ok(())
        } else {
            Err(Error::Permission(format!(
                "{user_id} is not a member of group {group_id}"
            )))
        }
    }

    /// Subscribe to the group's member set.
    ///
    /// The handler fires with the current set at registration and after
    /// every membership change.
    pub async fn subscribe_roster(
        &self,
        group_id: &GroupId,
        handler: RosterHandler,
    ) -> Result<Subscription, Error> {
        let callback: SubscriptionCallback =
            Arc::new(move |snapshot| handler(decode_flag_set(snapshot)));
        self.subscribe_path(&paths::members(group_id), callback)
            .await
    }
}
