//! Conversation memory.
//!
//! A [`ChatMemory`] is a handle onto the ordered message history of one
//! session. Handles are cheap to clone, and every clone sees the same
//! history. Messages are only ever appended: nothing is removed,
//! rewritten, reordered or deduplicated, and the history lives as long
//! as some handle (or the [`MemoryStore`] that created it) does.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chatbridge_model::Message;

/// Handle to the message history of one session.
#[derive(Clone)]
pub struct ChatMemory {
    session_id: Option<Arc<str>>,
    messages: Arc<Mutex<Vec<Message>>>,
}

impl ChatMemory {
    /// Creates a fresh, unshared session.
    #[inline]
    pub fn anonymous() -> Self {
        Self {
            session_id: None,
            messages: Default::default(),
        }
    }

    #[inline]
    fn named(session_id: &str) -> Self {
        Self {
            session_id: Some(session_id.into()),
            messages: Default::default(),
        }
    }

    /// Returns the session id, `None` for anonymous sessions.
    #[inline]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Returns a snapshot of the history, oldest first.
    ///
    /// Appends that land after this call are not reflected in the
    /// returned list.
    #[inline]
    pub fn history(&self) -> Vec<Message> {
        lock(&self.messages).clone()
    }

    /// Appends a message to the end of the history.
    ///
    /// Concurrent appends are linearized: every message ends up in the
    /// history exactly once.
    pub fn append(&self, message: Message) {
        let mut messages = lock(&self.messages);
        messages.push(message);
        trace!(
            "appended to session {:?}, {} messages",
            self.session_id,
            messages.len()
        );
    }

    /// Returns the number of messages in the history.
    #[inline]
    pub fn len(&self) -> usize {
        lock(&self.messages).len()
    }

    /// Whether the history is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether both handles refer to the same session.
    #[inline]
    pub fn same_session(&self, other: &ChatMemory) -> bool {
        Arc::ptr_eq(&self.messages, &other.messages)
    }
}

impl Debug for ChatMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatMemory")
            .field("session_id", &self.session_id)
            .field("len", &self.len())
            .finish()
    }
}

/// A keyed registry of sessions.
///
/// A non-empty session id always resolves to the same history. An
/// absent or empty id denotes an ephemeral session: each lookup yields
/// a new anonymous handle that is not registered anywhere.
#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<String, ChatMemory>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for `session_id`, creating the session on
    /// first reference.
    pub fn session(&self, session_id: Option<&str>) -> ChatMemory {
        let Some(session_id) = session_id.filter(|id| !id.is_empty()) else {
            return ChatMemory::anonymous();
        };
        lock(&self.sessions)
            .entry(session_id.to_owned())
            .or_insert_with(|| {
                debug!("created session {session_id:?}");
                ChatMemory::named(session_id)
            })
            .clone()
    }

    /// Returns the history of `session_id`, empty if the session has
    /// never been referenced.
    pub fn history(&self, session_id: &str) -> Vec<Message> {
        let memory = lock(&self.sessions).get(session_id).cloned();
        memory.map(|m| m.history()).unwrap_or_default()
    }

    /// Appends a message to `session_id`, creating the session if
    /// absent.
    ///
    /// Appending to an empty id writes to a throwaway anonymous session.
    #[inline]
    pub fn append(&self, session_id: &str, message: Message) {
        self.session(Some(session_id)).append(message);
    }

    /// Returns the number of named sessions.
    #[inline]
    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    /// Whether no named session has been created yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("sessions", &self.len())
            .finish()
    }
}

// A poisoned lock still guards a consistent list: pushes can't panic
// half-way.
#[inline]
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
