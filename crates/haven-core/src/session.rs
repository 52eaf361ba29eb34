//! One open conversation view, orchestrating the live subscriptions.
//!
//! A session moves through
//! `Closed → CheckingMembership → {NotMember, Subscribed} → Closed`.
//! Opening verifies membership and, for members, attaches the three
//! independent streams (messages, roster, typing). A non-member session
//! exposes only the join affordance and can re-enter the membership check
//! via [`ChatSession::join`].
//!
//! Stream release is RAII: every live stream is held as a [`Subscription`]
//! guard that unsubscribes synchronously when dropped, so every exit path
//! releases what was opened, including a failure while attaching the second
//! or third stream. In-flight writes triggered just before closing are not
//! cancelled and may complete afterwards; that is accepted, not an error.

use std::fmt;

use haven_storage_traits::{RealtimeStore, StorePath, SubscriptionCallback};

use crate::error::Error;
use crate::membership::RosterHandler;
use crate::messages::MessageHandler;
use crate::types::{GroupId, UserId};
use crate::typing::TypingHandler;
use crate::ChatEngine;

/// RAII guard over one live store subscription.
///
/// Dropping the guard synchronously cancels the subscription.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Cancel the subscription now rather than at drop
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("live", &self.cancel.is_some())
            .finish()
    }
}

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No streams attached; terminal until reopened
    Closed,
    /// Membership check in flight
    CheckingMembership,
    /// The user is not a member; only the join affordance is available
    NotMember,
    /// All three streams are live
    Subscribed,
}

/// The callbacks a conversation view registers for its three streams
#[derive(Clone)]
pub struct SessionHandlers {
    /// Receives the full message log, newest first
    pub on_messages: MessageHandler,
    /// Receives the current member id set
    pub on_roster: RosterHandler,
    /// Receives the ids currently flagged as typing (including the viewer)
    pub on_typing: TypingHandler,
}

impl fmt::Debug for SessionHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandlers").finish_non_exhaustive()
    }
}

/// One open group view for one user.
#[derive(Debug)]
pub struct ChatSession {
    group_id: GroupId,
    user_id: UserId,
    handlers: SessionHandlers,
    state: SessionState,
    streams: Vec<Subscription>,
}

impl ChatSession {
    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The group this session views
    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    /// The viewing user
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Release all live streams and move to `Closed`.
    ///
    /// Dropping the session has the same effect; `close` exists so views
    /// can tear down deterministically before the session goes out of
    /// scope.
    pub fn close(&mut self) {
        self.streams.clear();
        if self.state != SessionState::Closed {
            tracing::debug!(
                group_id = %self.group_id,
                user = %self.user_id,
                "chat session closed"
            );
        }
        self.state = SessionState::Closed;
    }

    /// Re-run the membership check and (re)attach streams.
    ///
    /// Any previously attached streams are released first. On a storage
    /// failure while attaching, streams opened before the failure are
    /// released and the session ends up `Closed`.
    pub async fn reopen<Storage>(&mut self, engine: &ChatEngine<Storage>) -> Result<(), Error>
    where
        Storage: RealtimeStore + 'static,
    {
        self.streams.clear();
        self.state = SessionState::CheckingMembership;

        if !engine.is_member(&self.group_id, &self.user_id).await? {
            self.state = SessionState::NotMember;
            tracing::debug!(
                group_id = %self.group_id,
                user = %self.user_id,
                "session opened for non-member"
            );
            return Ok(());
        }

        match engine.open_streams(&self.group_id, &self.handlers).await {
            Ok(streams) => {
                self.streams = streams;
                self.state = SessionState::Subscribed;
                tracing::debug!(
                    group_id = %self.group_id,
                    user = %self.user_id,
                    "chat session subscribed"
                );
                Ok(())
            }
            Err(error) => {
                self.state = SessionState::Closed;
                Err(error)
            }
        }
    }

    /// Join the group from a `NotMember` session, then re-enter the
    /// membership check and subscribe.
    pub async fn join<Storage>(
        &mut self,
        engine: &ChatEngine<Storage>,
        user_name: &str,
    ) -> Result<(), Error>
    where
        Storage: RealtimeStore + 'static,
    {
        if self.state != SessionState::NotMember {
            return Err(Error::Validation(
                "join is only available from a non-member session".to_string(),
            ));
        }
        engine
            .join_group(&self.group_id, &self.user_id, user_name)
            .await?;
        self.reopen(engine).await
    }
}

impl<Storage> ChatEngine<Storage>
where
    Storage: RealtimeStore + 'static,
{
    /// Open a conversation view for `user_id` on `group_id`.
    ///
    /// Checks membership and, for members, attaches the message, roster and
    /// typing streams before returning; each handler has then already
    /// received its initial snapshot. For non-members the session is
    /// returned in [`SessionState::NotMember`] with no streams attached.
    pub async fn open_session(
        &self,
        group_id: GroupId,
        user_id: UserId,
        handlers: SessionHandlers,
    ) -> Result<ChatSession, Error> {
        let mut session = ChatSession {
            group_id,
            user_id,
            handlers,
            state: SessionState::Closed,
            streams: Vec::new(),
        };
        session.reopen(self).await?;
        Ok(session)
    }

    pub(crate) async fn open_streams(
        &self,
        group_id: &GroupId,
        handlers: &SessionHandlers,
    ) -> Result<Vec<Subscription>, Error> {
        let mut streams = Vec::with_capacity(3);
        streams.push(
            self.subscribe_messages(group_id, handlers.on_messages.clone())
                .await?,
        );
        streams.push(
            self.subscribe_roster(group_id, handlers.on_roster.clone())
                .await?,
        );
        streams.push(
            self.subscribe_typing(group_id, handlers.on_typing.clone())
                .await?,
        );
        Ok(streams)
    }

    /// Register a raw store subscription wrapped in a cancel-on-drop guard
    pub(crate) async fn subscribe_path(
        &self,
        path: &StorePath,
        callback: SubscriptionCallback,
    ) -> Result<Subscription, Error> {
        let token = self.storage().subscribe(path, callback).await?;
        let storage = self.storage_handle();
        Ok(Subscription::new(move || storage.unsubscribe(token)))
    }
}
