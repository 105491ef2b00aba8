//! The invocation bridge: type-erased backend client, conversation memory,
//! streaming bridge and the chain that ties them together.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod chain;
mod error;
pub mod memory;
mod model_client;
pub mod stream;

pub use chain::{Chain, ChainInput, ChainOutput};
pub use error::{BackendError, Error, UsageError};
pub use memory::{ChatMemory, MemoryStore};
pub use model_client::{ModelClient, StreamedResponse};
pub use stream::{StreamHandle, StreamSnapshot, StreamState};
