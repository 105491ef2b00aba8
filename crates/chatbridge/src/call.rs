use chatbridge_core::{
    Chain, ChainInput, ChainOutput, ChatMemory, Error, ModelClient, StreamHandle,
};
use chatbridge_model::FunctionCall;
use serde::Deserialize;

/// The serializable part of [`CallParams`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct CallOptions {
    /// The user's prompt, required.
    pub prompt: Option<String>,
    /// Serialized JSON array of function declarations.
    pub functions: Option<String>,
    /// Whether to stream the answer.
    pub stream: bool,
}

/// Parameters of [`chain_call`].
#[derive(Clone, Debug)]
pub struct CallParams {
    /// The backend to ask.
    pub llm: ModelClient,
    /// The conversation to continue, if any.
    pub chat_memory: Option<ChatMemory>,
    /// The user's prompt, required.
    pub prompt: Option<String>,
    /// Serialized JSON array of function declarations.
    pub functions: Option<String>,
    /// Whether to stream the answer.
    pub stream: bool,
}

impl CallParams {
    /// Creates parameters for the given backend, without memory or prompt.
    #[inline]
    pub fn new(llm: ModelClient) -> Self {
        Self {
            llm,
            chat_memory: None,
            prompt: None,
            functions: None,
            stream: false,
        }
    }

    /// Sets the memory.
    #[inline]
    pub fn with_memory(mut self, chat_memory: ChatMemory) -> Self {
        self.chat_memory = Some(chat_memory);
        self
    }

    /// Sets the prompt.
    #[inline]
    pub fn with_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Sets the serialized function declarations.
    #[inline]
    pub fn with_functions<S: Into<String>>(mut self, functions: S) -> Self {
        self.functions = Some(functions.into());
        self
    }

    /// Sets whether to stream the answer.
    #[inline]
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Replaces prompt, functions and stream flag with the given options.
    #[inline]
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.prompt = options.prompt;
        self.functions = options.functions;
        self.stream = options.stream;
        self
    }
}

/// The answer part of [`CallOutput`].
#[derive(Debug)]
pub enum Output {
    /// The complete text of a non-streaming call.
    Text(String),
    /// The answer of a streaming call, still being produced.
    Stream(StreamHandle),
}

/// The result of [`chain_call`].
#[derive(Debug)]
pub struct CallOutput {
    /// The answer.
    pub default: Output,
    /// The function the model asked to call. Always `None` for streaming
    /// calls.
    pub function_call: Option<FunctionCall>,
}

/// Sends a prompt to a backend, continuing the conversation in
/// `chat_memory` if given.
///
/// See [`Chain::call`] for the exact behavior.
pub async fn chain_call(params: CallParams) -> Result<CallOutput, Error> {
    let mut chain = Chain::new(params.llm);
    if let Some(memory) = params.chat_memory {
        chain = chain.with_memory(memory);
    }
    let input = ChainInput {
        prompt: params.prompt,
        functions: params.functions,
        stream: params.stream,
    };

    let output = match chain.call(input).await? {
        ChainOutput::Message {
            content,
            function_call,
        } => CallOutput {
            default: Output::Text(content),
            function_call,
        },
        ChainOutput::Stream(handle) => CallOutput {
            default: Output::Stream(handle),
            function_call: None,
        },
    };
    Ok(output)
}
