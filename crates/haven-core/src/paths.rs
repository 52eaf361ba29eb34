//! The store path schema, in one place.
//!
//! Every operation addresses the store through these builders so the wire
//! layout (`groups/{g}/members/{u}`, `groups/{g}/messages/{m}`,
//! `groups/{g}/typing/{u}`) is never assembled ad hoc.

use haven_storage_traits::StorePath;

use crate::types::{GroupId, MessageId, UserId};

const GROUPS: &str = "groups";
const MEMBERS: &str = "members";
const MESSAGES: &str = "messages";
const TYPING: &str = "typing";
const READ_BY: &str = "readBy";

pub(crate) fn groups_root() -> StorePath {
    StorePath::root().child(GROUPS)
}

pub(crate) fn group(group_id: &GroupId) -> StorePath {
    groups_root().child(group_id.as_str())
}

pub(crate) fn members(group_id: &GroupId) -> StorePath {
    group(group_id).child(MEMBERS)
}

pub(crate) fn member(group_id: &GroupId, user_id: &UserId) -> StorePath {
    members(group_id).child(user_id.as_str())
}

pub(crate) fn messages(group_id: &GroupId) -> StorePath {
    group(group_id).child(MESSAGES)
}

pub(crate) fn message(group_id: &GroupId, message_id: &MessageId) -> StorePath {
    messages(group_id).child(message_id.as_str())
}

pub(crate) fn read_marker(
    group_id: &GroupId,
    message_id: &MessageId,
    user_id: &UserId,
) -> StorePath {
    message(group_id, message_id)
        .child(READ_BY)
        .child(user_id.as_str())
}

pub(crate) fn typing(group_id: &GroupId) -> StorePath {
    group(group_id).child(TYPING)
}

pub(crate) fn typing_user(group_id: &GroupId, user_id: &UserId) -> StorePath {
    typing(group_id).child(user_id.as_str())
}
