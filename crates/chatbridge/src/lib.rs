//! Entry points for hosts that want chat completions with optional memory
//! and streaming.
//!
//! Three calls cover the common flow:
//!
//! 1. [`new_openai`] creates a backend handle for an OpenAI-compatible API.
//! 2. [`chat_memory`] resolves a session id to a conversation memory kept
//!    for the lifetime of the process.
//! 3. [`chain_call`] sends a prompt, with the session's history, and returns
//!    either the complete answer or a handle to the streamed one.
//!
//! The crate also ships a terminal chat program (feature `cli`).

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

mod call;
mod memory;
mod openai;

pub use call::{CallOptions, CallOutput, CallParams, Output, chain_call};
pub use memory::{MemoryParams, chat_memory, memory_store};
pub use openai::{OpenAIParams, new_openai};

/// Re-exports of [`chatbridge_core`] crate.
pub mod core {
    pub use chatbridge_core::*;
}

/// Re-exports of [`chatbridge_model`] crate.
pub mod model {
    pub use chatbridge_model::*;
}
