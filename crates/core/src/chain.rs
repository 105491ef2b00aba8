
use std::sync::Arc;

use chatbridge_model::{
    FunctionCall, Message, ModelRequest, parse_function_schema,
};
use tokio::runtime::Handle;
use tracing::Instrument;

use crate::error::{Error, UsageError};
use crate::memory::ChatMemory;
use crate::model_client::ModelClient;
use crate::stream::{self, StreamHandle, StreamWriter};

/// One invocation of a chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainInput {
    /// The user's prompt, required.
    pub prompt: Option<String>,
    /// Serialized JSON array of function declarations. Absent, empty or
    /// whitespace-only text means no functions.
    pub functions: Option<String>,
    /// Whether to stream the answer.
    pub stream: bool,
}

impl ChainInput {
    /// Creates an input with the given prompt.
    #[inline]
    pub fn with_prompt<S: Into<String>>(prompt: S) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Default::default()
        }
    }

    /// Sets the serialized function schema.
    #[inline]
    pub fn functions<S: Into<String>>(mut self, functions: S) -> Self {
        self.functions = Some(functions.into());
        self
    }

    /// Sets whether to stream the answer.
    #[inline]
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// The result of a chain invocation.
#[derive(Debug)]
pub enum ChainOutput {
    /// The complete answer of a non-streaming invocation.
    Message {
        /// The assistant's text.
        content: String,
        /// The function the model asked to call, if any.
        function_call: Option<FunctionCall>,
    },
    /// The answer is being streamed.
    Stream(StreamHandle),
}

/// Runs prompts against a backend, optionally keeping the conversation
/// in a memory.
///
/// With memory attached, every invocation sees the history accumulated
/// so far. The user message is recorded before the backend is asked and
/// stays in the history even if the backend fails. The assistant message
/// is recorded only for successful answers.
#[derive(Clone, Debug)]
pub struct Chain {
    client: ModelClient,
    memory: Option<ChatMemory>,
}

struct Prepared {
    prompt: String,
    request: ModelRequest,
    runtime: Option<Handle>,
}

impl Chain {
    /// Creates a chain without memory.
    #[inline]
    pub fn new(client: ModelClient) -> Self {
        Self {
            client,
            memory: None,
        }
    }

    /// Attaches a memory to the chain.
    #[inline]
    pub fn with_memory(mut self, memory: ChatMemory) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Returns the attached memory.
    #[inline]
    pub fn memory(&self) -> Option<&ChatMemory> {
        self.memory.as_ref()
    }

    /// Runs the chain once.
    ///
    /// Usage errors are reported before anything else happens: the backend
    /// is not contacted and the memory stays untouched.
    ///
    /// A streaming invocation returns as soon as the request is handed to
    /// a background task. That task drives the backend to the end, even
    /// if the returned handle is dropped, and records the assistant
    /// message once the stream is done.
    pub async fn call(&self, input: ChainInput) -> Result<ChainOutput, Error> {
        let Prepared {
            prompt,
            mut request,
            runtime,
        } = self.prepare(input)?;

        let user_message = Message::user(prompt);
        if let Some(memory) = &self.memory {
            request.messages = memory.history();
            memory.append(user_message.clone());
        }
        request.messages.push(user_message);

        debug!(
            "calling backend with {} messages, {} functions, stream: {}",
            request.messages.len(),
            request.functions.len(),
            runtime.is_some()
        );

        match runtime {
            Some(runtime) => {
                let handle = self.spawn_stream(&runtime, request);
                Ok(ChainOutput::Stream(handle))
            }
            None => self.complete(request).await,
        }
    }

    fn prepare(&self, input: ChainInput) -> Result<Prepared, UsageError> {
        let Some(prompt) = input.prompt else {
            return Err(UsageError::MissingPrompt);
        };

        let functions = match input.functions.as_deref().map(str::trim) {
            None | Some("") => vec![],
            Some(text) => parse_function_schema(text).map_err(|err| {
                UsageError::MalformedFunctions(err.to_string())
            })?,
        };

        let runtime = if input.stream {
            if !self.client.supports_streaming() {
                return Err(UsageError::StreamingUnsupported);
            }
            Some(Handle::try_current().map_err(|_| UsageError::NoRuntime)?)
        } else {
            None
        };

        Ok(Prepared {
            prompt,
            request: ModelRequest {
                messages: vec![],
                functions,
            },
            runtime,
        })
    }

    async fn complete(
        &self,
        request: ModelRequest,
    ) -> Result<ChainOutput, Error> {
        let message =
            self.client.complete(request).await.inspect_err(|err| {
                warn!("backend failed: {err}");
            })?;

        if let Some(memory) = &self.memory {
            memory.append(message.clone());
        }

        Ok(ChainOutput::Message {
            content: message.content,
            function_call: message.function_call,
        })
    }

    fn spawn_stream(
        &self,
        runtime: &Handle,
        request: ModelRequest,
    ) -> StreamHandle {
        let (writer, handle) = stream::channel();
        let client = self.client.clone();
        let memory = self.memory.clone();
        let session = memory.as_ref().and_then(|m| m.session_id());
        let span = debug_span!("chain stream", session = session.unwrap_or(""));
        let task = drive_stream(client, memory, request, writer);
        runtime.spawn(task.instrument(span));
        handle
    }
}

async fn drive_stream(
    client: ModelClient,
    memory: Option<ChatMemory>,
    request: ModelRequest,
    writer: StreamWriter,
) {
    let writer = Arc::new(writer);
    let on_fragment = {
        let writer = Arc::clone(&writer);
        move |fragment: &str| {
            if let Err(err) = writer.append(fragment) {
                warn!("dropped a fragment: {err}");
            }
        }
    };

    match client.stream(request, on_fragment).await {
        Ok(resp) => {
            writer.close(None);
            debug!(
                "stream done, finish reason: {:?}, {} bytes",
                resp.finish_reason,
                resp.content.len()
            );
            if resp.content.is_empty() {
                return;
            }
            if let Some(memory) = memory {
                memory.append(Message::assistant(resp.content));
            }
        }
        Err(err) => {
            error!("stream failed: {err}");
            writer.close(Some(err));
        }
    }
}
