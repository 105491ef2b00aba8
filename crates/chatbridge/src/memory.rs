use std::sync::LazyLock;

use chatbridge_core::{ChatMemory, MemoryStore};
use serde::Deserialize;

static STORE: LazyLock<MemoryStore> = LazyLock::new(MemoryStore::new);

/// Parameters of [`chat_memory`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct MemoryParams {
    /// The session to resolve. Absent or empty means a fresh session that
    /// nobody else can reach.
    pub session_id: Option<String>,
}

/// Returns the memory of a session.
///
/// Sessions live in a process-wide store, so every call with the same
/// non-empty id yields a handle onto the same history.
#[inline]
pub fn chat_memory(params: MemoryParams) -> ChatMemory {
    STORE.session(params.session_id.as_deref())
}

/// Returns the process-wide store behind [`chat_memory`].
#[inline]
pub fn memory_store() -> &'static MemoryStore {
    &STORE
}
