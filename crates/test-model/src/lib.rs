//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use chatbridge_model::{
    ErrorKind, Message, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: VecDeque<PresetEvent>,
    delay: Duration,
    completed: bool,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();

        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;

            while let Some(event) = this.events.pop_front() {
                match event {
                    PresetEvent::MessageDelta(msg) => {
                        return Poll::Ready(Ok(Some(
                            ModelResponseEvent::MessageDelta(msg),
                        )));
                    }
                    PresetEvent::FunctionCall(_) => continue,
                    PresetEvent::Failure(message) => {
                        this.completed = true;
                        return Poll::Ready(Err(Error::new(
                            message,
                            ErrorKind::Other,
                        )));
                    }
                }
            }

            if this.completed {
                // In case this method is called after completion.
                return Poll::Ready(Ok(None));
            }
            this.completed = true;
            return Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                ModelFinishReason::Stop,
            ))));
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_event(cx)
    }
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how
/// the model should respond. Each request consumes the next preset
/// response in order. If there are no enough responses in the script,
/// an error will be returned.
///
/// Clones share the script and the request log, so a test can keep a
/// clone around to inspect what the provider received.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone)]
pub struct TestModelProvider {
    script: Arc<Mutex<VecDeque<PresetResponse>>>,
    requests: Arc<Mutex<Vec<ModelRequest>>>,
    delay: Duration,
    streaming: bool,
}

impl Default for TestModelProvider {
    fn default() -> Self {
        Self {
            script: Default::default(),
            requests: Default::default(),
            delay: Duration::from_millis(1),
            streaming: true,
        }
    }
}

impl TestModelProvider {
    #[inline]
    pub fn add_response(&self, preset: PresetResponse) {
        lock(&self.script).push_back(preset);
    }

    /// Sets the delay before each event, and before a complete answer.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = duration;
    }

    /// Sets whether this provider reports streaming support.
    #[inline]
    pub fn set_streaming(&mut self, streaming: bool) {
        self.streaming = streaming;
    }

    /// Returns the requests received so far.
    #[inline]
    pub fn requests(&self) -> Vec<ModelRequest> {
        lock(&self.requests).clone()
    }

    #[inline]
    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    fn next_preset(&self, req: &ModelRequest) -> Result<PresetResponse, Error> {
        lock(&self.requests).push(req.clone());
        let Some(preset) = lock(&self.script).pop_front() else {
            return Err(Error::new("no enough steps", ErrorKind::Other));
        };
        if let Some(message) = preset.rejection {
            return Err(Error::new(message, ErrorKind::Other));
        }
        Ok(preset)
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    #[inline]
    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    fn complete(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Message, Self::Error>> + Send + 'static
    {
        let preset = self.next_preset(req);
        let delay = self.delay;
        async move {
            sleep(delay).await;
            let mut content = String::new();
            let mut function_call = None;
            for event in preset?.events {
                match event {
                    PresetEvent::MessageDelta(delta) => content.push_str(&delta),
                    PresetEvent::FunctionCall(call) => function_call = Some(call),
                    PresetEvent::Failure(message) => {
                        return Err(Error::new(message, ErrorKind::Other));
                    }
                }
            }
            Ok(Message {
                function_call,
                ..Message::assistant(content)
            })
        }
    }

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let resp = if self.streaming {
            self.next_preset(req).map(|preset| TestModelResponse {
                events: preset.events.into(),
                delay: self.delay,
                completed: false,
                sleep: None,
            })
        } else {
            lock(&self.requests).push(req.clone());
            Err(Error::new(
                "streaming is not supported",
                ErrorKind::Unsupported,
            ))
        };
        std::future::ready(resp)
    }
}

#[inline]
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Debug for TestModelProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestModelProvider")
            .field("pending", &lock(&self.script).len())
            .field("delay", &self.delay)
            .field("streaming", &self.streaming)
            .finish()
    }
}
