//! Shared helpers for the in-crate test modules.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use haven_memory_storage::MemoryStore;

use crate::session::SessionHandlers;
use crate::types::{GroupId, Message, UserId};
use crate::ChatEngine;

/// Engine over a fresh in-memory store
pub fn create_test_engine() -> ChatEngine<MemoryStore> {
    ChatEngine::new(MemoryStore::default())
}

/// Create a group owned by "alice" and return its id and her id
pub async fn seeded_group(engine: &ChatEngine<MemoryStore>) -> (GroupId, UserId) {
    let alice = UserId::from("alice");
    let group_id = engine
        .create_group("Anxiety Support", "A calm corner", &alice)
        .await
        .unwrap();
    (group_id, alice)
}

/// Thread-safe sink capturing every delivery a handler receives
pub struct Recorder<T> {
    items: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone> Recorder<T> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push(&self, item: T) {
        self.items.lock().unwrap().push(item);
    }

    pub fn items(&self) -> Vec<T> {
        self.items.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<T> {
        self.items.lock().unwrap().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

/// Session handlers backed by one recorder per stream
pub fn recording_handlers() -> (
    SessionHandlers,
    Recorder<Vec<Message>>,
    Recorder<BTreeSet<UserId>>,
    Recorder<BTreeSet<UserId>>,
) {
    let messages: Recorder<Vec<Message>> = Recorder::new();
    let roster: Recorder<BTreeSet<UserId>> = Recorder::new();
    let typing: Recorder<BTreeSet<UserId>> = Recorder::new();

    let message_sink = messages.clone();
    let roster_sink = roster.clone();
    let typing_sink = typing.clone();
    let handlers = SessionHandlers {
        on_messages: Arc::new(move |log| message_sink.push(log)),
        on_roster: Arc::new(move |set| roster_sink.push(set)),
        on_typing: Arc::new(move |set| typing_sink.push(set)),
    };
    (handlers, messages, roster, typing)
}
