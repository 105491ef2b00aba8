use serde::{Deserialize, Serialize};

/// The author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The system instructions.
    System,
    /// The human side of the conversation.
    User,
    /// The model.
    Assistant,
    /// The result of a function the model asked to call.
    Function,
}

/// A function call requested by the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function to call.
    pub name: String,
    /// Arguments to pass to the function.
    ///
    /// The serialization is chosen by the backend (usually JSON), and
    /// this layer never looks into it.
    pub arguments: String,
}

/// A complete chat message.
///
/// A message is never modified after it has been appended to a
/// conversation history.
///
/// `function_call` being `None` is not the same as an empty call: its
/// presence means the model is asking the caller to run a function
/// rather than answering with plain content.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote this message.
    pub role: Role,
    /// The text content, may be empty for function call requests.
    pub content: String,
    /// The function call requested by the model, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    /// For [`Role::Function`] messages, the function that produced
    /// the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    #[inline]
    fn new(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            function_call: None,
            name: None,
        }
    }

    /// Creates a system message.
    #[inline]
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self::new(Role::System, content.into())
    }

    /// Creates a user message.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::new(Role::User, content.into())
    }

    /// Creates an assistant message with plain content.
    #[inline]
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self::new(Role::Assistant, content.into())
    }

    /// Creates a message carrying the result of the function `name`.
    #[inline]
    pub fn function<N: Into<String>, S: Into<String>>(name: N, content: S) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(Role::Function, content.into())
        }
    }

    /// Attaches a function call request to this message.
    #[inline]
    pub fn with_function_call(mut self, function_call: FunctionCall) -> Self {
        self.function_call = Some(function_call);
        self
    }
}
