//! An abstraction layer for different chat-completion backends.
//!
//! This crate establishes an unified protocol for callers to interact
//! with various supported LLM backends, so that they can seamlessly
//! switch between them without modifying the calling code.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to. Conversation
//! memory, streaming and orchestration live in `chatbridge-core`.

#![deny(missing_docs)]

mod error;
mod message;
mod provider;
mod request;
mod response;

pub use error::*;
pub use message::*;
pub use provider::*;
pub use request::*;
pub use response::*;
