//! The append-only, soft-deletable message log.
//!
//! Appends never mutate or reorder previously stored messages, and the
//! store assigns both the id and the timestamp. Deletion is soft: the body
//! is replaced by the tombstone and `deletedAt` is set, while the id and
//! the original timestamp are preserved so replies keep resolving. Readers
//! reconcile by re-deriving the full log from each delivered snapshot; the
//! subscription is not an in-order diff stream.

use std::sync::Arc;

use haven_storage_traits::{RealtimeStore, Snapshot, SubscriptionCallback, server_timestamp};
use serde_json::{Map, Value, json};

use crate::constant::TOMBSTONE_TEXT;
use crate::error::Error;
use crate::session::Subscription;
use crate::types::{GroupId, Message, MessageId, UserId};
use crate::{ChatEngine, paths};

/// Callback receiving the group's full message log, newest first
pub type MessageHandler = Arc<dyn Fn(Vec<Message>) + Send + Sync>;

impl<Storage> ChatEngine<Storage>
where
    Storage: RealtimeStore + 'static,
{
    /// Append a message to the group's log.
    ///
    /// `text` is trimmed; an empty result fails with [`Error::Validation`],
    /// and a non-member sender fails with [`Error::Permission`] before
    /// anything is written. The new record starts with the sender as its
    /// only reader. `reply_to` is stored as a reference and is allowed to
    /// point at a message that is later soft-deleted.
    pub async fn send_message(
        &self,
        group_id: &GroupId,
        sender_id: &UserId,
        sender_name: &str,
        text: &str,
        reply_to: Option<&MessageId>,
    ) -> Result<MessageId, Error> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation(
                "message text must not be empty".to_string(),
            ));
        }
        self.ensure_member(group_id, sender_id).await?;

        let message_id = self
            .write_message_record(group_id, sender_id, sender_name, text, reply_to, sender_id)
            .await?;
        tracing::debug!(
            group_id = %group_id,
            message_id = %message_id,
            sender = %sender_id,
            "appended message"
        );
        Ok(message_id)
    }

    /// Write one message record with a store-assigned id and timestamp.
    ///
    /// Shared by user sends and system announcements; callers are
    /// responsible for any validation and membership guarding.
    pub(crate) async fn write_message_record(
        &self,
        group_id: &GroupId,
        sender_id: &UserId,
        sender_name: &str,
        text: &str,
        reply_to: Option<&MessageId>,
        first_reader: &UserId,
    ) -> Result<MessageId, Error> {
        let key = self
            .storage()
            .push_unique_child(&paths::messages(group_id))
            .await?;
        let message_id = MessageId::new(key);

        let mut node = json!({
            "text": text,
            "userId": sender_id,
            "userName": sender_name,
            "timestamp": server_timestamp(),
        });
        if let Some(reply_to) = reply_to {
            node["replyTo"] = json!(reply_to);
        }
        node["readBy"][first_reader.as_str()] = Value::Bool(true);

        self.storage()
            .write(&paths::message(group_id, &message_id), node)
            .await?;
        Ok(message_id)
    }

    /// Soft-delete a message.
    ///
    /// Only the author may delete: anyone else fails with
    /// [`Error::Permission`]. The text is overwritten with the fixed
    /// tombstone and `deletedAt` is set to the server time; `id` and the
    /// original `timestamp` are untouched. Deleting an already-deleted
    /// message is a no-op success.
    pub async fn delete_message(
        &self,
        group_id: &GroupId,
        message_id: &MessageId,
        requester_id: &UserId,
    ) -> Result<(), Error> {
        let Some(node) = self
            .storage()
            .read(&paths::message(group_id, message_id))
            .await?
        else {
            return Err(Error::NotFound(format!("message {message_id}")));
        };
        let message = Message::from_snapshot(message_id.clone(), node)?;

        // Deletion is terminal and idempotent
        if message.is_deleted() {
            return Ok(());
        }
        if message.sender_id != *requester_id {
            return Err(Error::Permission(format!(
                "{requester_id} is not the author of message {message_id}"
            )));
        }

        let mut entries = Map::new();
        entries.insert("text".to_string(), Value::String(TOMBSTONE_TEXT.to_string()));
        entries.insert("deletedAt".to_string(), server_timestamp());
        self.storage()
            .update(&paths::message(group_id, message_id), entries)
            .await?;

        tracing::debug!(group_id = %group_id, message_id = %message_id, "soft-deleted message");
        Ok(())
    }

    /// Subscribe to the group's message log.
    ///
    /// The handler fires with the full log, newest first, at registration
    /// and after every create or soft-delete under the group.
    pub async fn subscribe_messages(
        &self,
        group_id: &GroupId,
        handler: MessageHandler,
    ) -> Result<Subscription, Error> {
        let callback: SubscriptionCallback =
            Arc::new(move |snapshot| handler(decode_message_log(snapshot)));
        self.subscribe_path(&paths::messages(group_id), callback)
            .await
    }
}

/// Decode the messages subtree into a newest-first list.
///
/// A node that fails to decode is logged and skipped rather than tearing
/// down the whole stream.
fn decode_message_log(snapshot: Snapshot) -> Vec<Message> {
    let Some(Value::Object(entries)) = snapshot else {
        return Vec::new();
    };
    let mut messages = Vec::with_capacity(entries.len());
    for (key, node) in entries {
        match Message::from_snapshot(MessageId::new(key), node) {
            Ok(message) => messages.push(message),
            Err(error) => tracing::warn!(%error, "skipping undecodable message node"),
        }
    }
    messages.sort_by(|a, b| b.append_order_cmp(a));
    messages
}

#[cfg(test)]
mod tests {
    use crate::test_util::{Recorder, create_test_engine, seeded_group};

    use super::*;

    #[tokio::test]
    async fn test_send_message_stores_record() {
        let engine = create_test_engine();
        let (group_id, alice) = seeded_group(&engine).await;

        let m1 = engine
            .send_message(&group_id, &alice, "Alice", "Hello", None)
            .await
            .unwrap();

        let group = engine.find_group(&group_id).await.unwrap().unwrap();
        let message = &group.messages[&m1];
        assert_eq!(message.text, "Hello");
        assert_eq!(message.sender_id, alice);
        assert_eq!(message.sender_name, "Alice");
        assert!(message.is_read_by(&alice), "sender has observed their own message");
        assert!(!message.is_deleted());
        assert_eq!(message.reply_to, None);
    }

    #[tokio::test]
    async fn test_send_message_trims_and_rejects_empty() {
        let engine = create_test_engine();
        let (group_id, alice) = seeded_group(&engine).await;

        let err = engine
            .send_message(&group_id, &alice, "Alice", "  \n ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let m1 = engine
            .send_message(&group_id, &alice, "Alice", "  hi  ", None)
            .await
            .unwrap();
        let group = engine.find_group(&group_id).await.unwrap().unwrap();
        assert_eq!(group.messages[&m1].text, "hi");
    }

    #[tokio::test]
    async fn test_non_member_send_is_rejected_without_write() {
        let engine = create_test_engine();
        let (group_id, _alice) = seeded_group(&engine).await;
        let mallory = UserId::from("mallory");

        let err = engine
            .send_message(&group_id, &mallory, "Mallory", "hi", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Permission(_)));

        let group = engine.find_group(&group_id).await.unwrap().unwrap();
        assert!(group.messages.is_empty(), "rejected append wrote nothing");
    }

    #[tokio::test]
    async fn test_append_timestamps_are_monotonic() {
        let engine = create_test_engine();
        let (group_id, alice) = seeded_group(&engine).await;

        for i in 0..5 {
            engine
                .send_message(&group_id, &alice, "Alice", &format!("msg {i}"), None)
                .await
                .unwrap();
        }

        let group = engine.find_group(&group_id).await.unwrap().unwrap();
        let newest_first = group.messages_newest_first();
        for pair in newest_first.windows(2) {
            assert!(pair[0].timestamp > pair[1].timestamp);
        }
        assert_eq!(newest_first.last().unwrap().text, "msg 0");
    }

    #[tokio::test]
    async fn test_delete_message_leaves_tombstone() {
        let engine = create_test_engine();
        let (group_id, alice) = seeded_group(&engine).await;

        let m1 = engine
            .send_message(&group_id, &alice, "Alice", "regret this", None)
            .await
            .unwrap();
        let before = engine.find_group(&group_id).await.unwrap().unwrap();
        let original_timestamp = before.messages[&m1].timestamp;

        engine.delete_message(&group_id, &m1, &alice).await.unwrap();

        let after = engine.find_group(&group_id).await.unwrap().unwrap();
        let message = &after.messages[&m1];
        assert_eq!(message.text, TOMBSTONE_TEXT);
        assert!(message.is_deleted());
        assert_eq!(message.id, m1);
        assert_eq!(message.timestamp, original_timestamp);
        assert!(message.deleted_at.unwrap() > original_timestamp);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let engine = create_test_engine();
        let (group_id, alice) = seeded_group(&engine).await;

        let m1 = engine
            .send_message(&group_id, &alice, "Alice", "once", None)
            .await
            .unwrap();
        engine.delete_message(&group_id, &m1, &alice).await.unwrap();

        let first = engine.find_group(&group_id).await.unwrap().unwrap();
        let first_state = first.messages[&m1].clone();

        // Second delete succeeds and changes nothing, including deletedAt
        engine.delete_message(&group_id, &m1, &alice).await.unwrap();
        let second = engine.find_group(&group_id).await.unwrap().unwrap();
        assert_eq!(second.messages[&m1], first_state);
    }

    #[tokio::test]
    async fn test_only_author_may_delete() {
        let engine = create_test_engine();
        let (group_id, alice) = seeded_group(&engine).await;
        let bob = UserId::from("bob");
        engine.join_group(&group_id, &bob, "Bob").await.unwrap();

        let m1 = engine
            .send_message(&group_id, &alice, "Alice", "mine", None)
            .await
            .unwrap();

        let err = engine.delete_message(&group_id, &m1, &bob).await.unwrap_err();
        assert!(matches!(err, Error::Permission(_)));

        let group = engine.find_group(&group_id).await.unwrap().unwrap();
        assert!(!group.messages[&m1].is_deleted());
    }

    #[tokio::test]
    async fn test_delete_unknown_message_is_not_found() {
        let engine = create_test_engine();
        let (group_id, alice) = seeded_group(&engine).await;

        let err = engine
            .delete_message(&group_id, &MessageId::from("missing"), &alice)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reply_reference_survives_deletion() {
        let engine = create_test_engine();
        let (group_id, alice) = seeded_group(&engine).await;
        let bob = UserId::from("bob");
        engine.join_group(&group_id, &bob, "Bob").await.unwrap();

        let m1 = engine
            .send_message(&group_id, &alice, "Alice", "Hello", None)
            .await
            .unwrap();
        let m2 = engine
            .send_message(&group_id, &bob, "Bob", "Hi back", Some(&m1))
            .await
            .unwrap();

        engine.delete_message(&group_id, &m1, &alice).await.unwrap();

        let group = engine.find_group(&group_id).await.unwrap().unwrap();
        // The reply still references m1, whose preview is now the tombstone
        assert_eq!(group.messages[&m2].reply_to, Some(m1.clone()));
        assert_eq!(group.messages[&m1].text, TOMBSTONE_TEXT);
    }

    #[tokio::test]
    async fn test_subscription_redelivers_full_log_newest_first() {
        let engine = create_test_engine();
        let (group_id, alice) = seeded_group(&engine).await;

        let recorder: Recorder<Vec<Message>> = Recorder::new();
        let sink = recorder.clone();
        let stream = engine
            .subscribe_messages(&group_id, Arc::new(move |log| sink.push(log)))
            .await
            .unwrap();

        assert_eq!(recorder.last().unwrap(), Vec::new(), "initial empty log");

        let m1 = engine
            .send_message(&group_id, &alice, "Alice", "first", None)
            .await
            .unwrap();
        engine
            .send_message(&group_id, &alice, "Alice", "second", None)
            .await
            .unwrap();

        let log = recorder.last().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].text, "second");
        assert_eq!(log[1].text, "first");

        // A soft delete is delivered as a changed snapshot of the same log
        engine.delete_message(&group_id, &m1, &alice).await.unwrap();
        let log = recorder.last().unwrap();
        assert_eq!(log[1].text, TOMBSTONE_TEXT);

        drop(stream);
        let deliveries = recorder.len();
        engine
            .send_message(&group_id, &alice, "Alice", "after close", None)
            .await
            .unwrap();
        assert_eq!(recorder.len(), deliveries, "dropped stream is silent");
    }
}
