//! Group directory: create, list-available, and join.
//!
//! Groups are created once and never deleted. Membership only grows; there
//! is no leave operation. Joining performs two separate writes (membership,
//! then a system-authored announcement) with no transactional coupling: if
//! the announcement write fails the user is left joined without one, which
//! is a cosmetic, non-corrupting outcome that is never silently retried.

use haven_storage_traits::{RealtimeStore, server_timestamp};
use serde_json::{Value, json};

use crate::constant::{SYSTEM_SENDER_ID, SYSTEM_SENDER_NAME};
use crate::error::Error;
use crate::types::{Group, GroupId, UserId};
use crate::{ChatEngine, paths};

impl<Storage> ChatEngine<Storage>
where
    Storage: RealtimeStore + 'static,
{
    /// Create a group with the caller as its sole member.
    ///
    /// `name` and `description` are trimmed; either being empty afterwards
    /// fails with [`Error::Validation`]. Returns the store-assigned id.
    pub async fn create_group(
        &self,
        name: &str,
        description: &str,
        creator_id: &UserId,
    ) -> Result<GroupId, Error> {
        let name = name.trim();
        let description = description.trim();
        if name.is_empty() {
            return Err(Error::Validation("group name must not be empty".to_string()));
        }
        if description.is_empty() {
            return Err(Error::Validation(
                "group description must not be empty".to_string(),
            ));
        }

        let key = self
            .storage()
            .push_unique_child(&paths::groups_root())
            .await?;
        let group_id = GroupId::new(key);

        let mut node = json!({
            "name": name,
            "description": description,
            "createdAt": server_timestamp(),
            "createdBy": creator_id,
        });
        node["members"][creator_id.as_str()] = Value::Bool(true);

        self.storage().write(&paths::group(&group_id), node).await?;
        tracing::info!(group_id = %group_id, creator = %creator_id, "created group");
        Ok(group_id)
    }

    /// One-shot snapshot of every group the user has not yet joined.
    ///
    /// This is a finite read, not a live subscription; group-list screens
    /// re-invoke it on refresh.
    pub async fn list_available_groups(&self, user_id: &UserId) -> Result<Vec<Group>, Error> {
        let Some(value) = self.storage().read(&paths::groups_root()).await? else {
            return Ok(Vec::new());
        };
        let Value::Object(entries) = value else {
            return Err(Error::Serialization(
                "groups root is not an object".to_string(),
            ));
        };

        let mut available = Vec::with_capacity(entries.len());
        for (key, node) in entries {
            let group = Group::from_snapshot(GroupId::new(key), node)?;
            if !group.is_member(user_id) {
                available.push(group);
            }
        }
        Ok(available)
    }

    /// Point read of one group, or `None` if the id does not resolve
    pub async fn find_group(&self, group_id: &GroupId) -> Result<Option<Group>, Error> {
        match self.storage().read(&paths::group(group_id)).await? {
            Some(node) => Ok(Some(Group::from_snapshot(group_id.clone(), node)?)),
            None => Ok(None),
        }
    }

    /// Join a group and append the system join announcement.
    ///
    /// Fails with [`Error::NotFound`] if the group id does not resolve at
    /// the time of the write; the store does not enforce referential
    /// integrity beyond that best-effort check. The announcement is marked
    /// already-read by the joining user.
    pub async fn join_group(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        user_name: &str,
    ) -> Result<(), Error> {
        if self.find_group(group_id).await?.is_none() {
            return Err(Error::NotFound(format!("group {group_id}")));
        }

        self.storage()
            .write(&paths::member(group_id, user_id), Value::Bool(true))
            .await?;

        let text = format!("{user_name} has joined the group");
        self.write_message_record(
            group_id,
            &UserId::from(SYSTEM_SENDER_ID),
            SYSTEM_SENDER_NAME,
            &text,
            None,
            user_id,
        )
        .await?;

        tracing::info!(group_id = %group_id, user = %user_id, "user joined group");
        Ok(())
    }
}
