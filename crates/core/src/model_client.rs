use std::fmt::{self, Debug};
use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use chatbridge_model::{
    Message, ModelFinishReason, ModelProvider, ModelRequest, ModelResponse,
    ModelResponseEvent,
};
use tracing::Instrument;

use crate::error::BackendError;

type CompleteResult = Result<Message, BackendError>;
type StreamResult = Result<StreamedResponse, BackendError>;
type BoxedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type OnFragment = Box<dyn FnMut(&str) + Send + 'static>;
#[rustfmt::skip]
type CompleteFn = Arc<
    dyn Fn(ModelRequest) -> BoxedFuture<CompleteResult> + Send + Sync
>;
#[rustfmt::skip]
type StreamFn = Arc<
    dyn Fn(ModelRequest, OnFragment) -> BoxedFuture<StreamResult>
        + Send + Sync
>;

/// A wrapper around a model provider that provides a type-erased
/// interface for the other modules.
///
/// This is the backend handle callers pass around: the chain never
/// names a concrete provider type.
#[derive(Clone)]
pub struct ModelClient {
    complete_fn: CompleteFn,
    stream_fn: StreamFn,
    supports_streaming: bool,
}

impl ModelClient {
    /// Wraps a model provider.
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let supports_streaming = provider.supports_streaming();
        let provider = Arc::new(provider);

        let complete_fn: CompleteFn = {
            let provider = Arc::clone(&provider);
            Arc::new(move |req: ModelRequest| -> BoxedFuture<CompleteResult> {
                let fut = provider.complete(&req);
                Box::pin(
                    async move {
                        trace!("got a request: {:?}", req);
                        fut.await.map_err(|err| {
                            error!("got an error: {err:?}");
                            BackendError::from_provider(&err)
                        })
                    }
                    .instrument(trace_span!("model client complete")),
                )
            })
        };

        let stream_fn: StreamFn = Arc::new(
            move |req: ModelRequest,
                  on_fragment: OnFragment|
                  -> BoxedFuture<StreamResult> {
                let fut = provider.send_request(&req);
                Box::pin(
                    async move {
                        trace!("got a streaming request: {:?}", req);
                        let resp_or_err = fut.await;
                        handle_response::<P>(resp_or_err, on_fragment).await
                    }
                    .instrument(trace_span!("model client stream")),
                )
            },
        );

        Self {
            complete_fn,
            stream_fn,
            supports_streaming,
        }
    }

    /// Whether the wrapped provider can stream responses.
    #[inline]
    pub fn supports_streaming(&self) -> bool {
        self.supports_streaming
    }

    /// Sends a request and waits for the complete assistant message.
    #[inline]
    pub async fn complete(&self, req: ModelRequest) -> CompleteResult {
        (self.complete_fn)(req).await
    }

    /// Sends a streaming request, invoking `on_fragment` for every
    /// non-empty piece of text as it arrives, and returns the full
    /// response once the backend signals the end of the stream.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    #[inline]
    pub async fn stream(
        &self,
        req: ModelRequest,
        on_fragment: impl FnMut(&str) + Send + 'static,
    ) -> StreamResult {
        (self.stream_fn)(req, Box::new(on_fragment)).await
    }
}

impl Debug for ModelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClient")
            .field("supports_streaming", &self.supports_streaming)
            .finish_non_exhaustive()
    }
}

/// A completely received streaming response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamedResponse {
    /// Concatenation of all fragments, in arrival order.
    pub content: String,
    /// The reason the model finished generating, if the backend sent one.
    pub finish_reason: Option<ModelFinishReason>,
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
    mut on_fragment: OnFragment,
) -> StreamResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(BackendError::from_provider(&err));
        }
    };

    let mut content = String::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(event) => event,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(BackendError::from_provider(&err));
            }
        };

        let Some(event) = event else {
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                if delta.is_empty() {
                    continue;
                }
                content.push_str(&delta);
                on_fragment(&delta);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    Ok(StreamedResponse {
        content,
        finish_reason,
    })
}
