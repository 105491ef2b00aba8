use std::error::Error;

use crate::error::ErrorKind;
use crate::message::Message;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// The error type for a model provider.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A type that represents a model provider, which is an entry for
/// sending chat-completion requests to one backend.
///
/// Once the provider is created, it should behave like a stateless object.
/// It can still have internal state, but callers should not rely on it,
/// and the provider should be prepared for being dropped anytime.
pub trait ModelProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// The streaming response type for this provider.
    type Response: ModelResponse<Error = Self::Error>;

    /// Whether [`ModelProvider::send_request`] is supported.
    ///
    /// Callers must check this before asking for a streaming response.
    fn supports_streaming(&self) -> bool;

    /// Sends a request and waits for the complete assistant message.
    fn complete(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Message, Self::Error>> + Send + 'static;

    /// Sends a request and returns a response that delivers the answer
    /// incrementally.
    ///
    /// Providers that don't support streaming should fail with
    /// [`ErrorKind::Unsupported`].
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
