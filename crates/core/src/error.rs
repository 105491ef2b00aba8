use std::error::Error as StdError;
use std::fmt::{self, Display};

use chatbridge_model::{ErrorKind, ModelProviderError};

/// The caller violated the invocation contract.
///
/// These errors are reported before any request reaches a backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum UsageError {
    /// No prompt was supplied.
    MissingPrompt,
    /// The function schema is not a valid serialized array of function
    /// declarations.
    MalformedFunctions(String),
    /// Streaming was requested from a backend that can't stream.
    StreamingUnsupported,
    /// Streaming was requested outside of a tokio runtime.
    NoRuntime,
    /// No API key was supplied for a backend.
    MissingApiKey,
    /// The backend configuration was rejected.
    InvalidConfig(String),
}

impl Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageError::MissingPrompt => write!(f, "prompt is missing"),
            UsageError::MalformedFunctions(reason) => {
                write!(f, "malformed functions: {reason}")
            }
            UsageError::StreamingUnsupported => {
                write!(f, "the backend doesn't support streaming")
            }
            UsageError::NoRuntime => {
                write!(f, "streaming requires a tokio runtime")
            }
            UsageError::MissingApiKey => write!(f, "api key is missing"),
            UsageError::InvalidConfig(reason) => {
                write!(f, "invalid backend config: {reason}")
            }
        }
    }
}

impl StdError for UsageError {}

/// A failure reported by a backend.
///
/// This captures the kind and the message of the provider's own error
/// type, so it can be cloned and handed to every reader of a stream.
/// Failures to translate messages to or from the wire have the kind
/// [`ErrorKind::Serialization`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BackendError {
    kind: ErrorKind,
    message: String,
}

impl BackendError {
    /// Creates a new error.
    #[inline]
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Captures an error from a model provider.
    #[inline]
    pub fn from_provider<E: ModelProviderError>(err: &E) -> Self {
        Self::new(err.kind(), err.to_string())
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the failure happened while translating messages.
    #[inline]
    pub fn is_serialization(&self) -> bool {
        self.kind == ErrorKind::Serialization
    }
}

impl Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl StdError for BackendError {}

/// The error type for chain invocations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// See [`UsageError`].
    Usage(UsageError),
    /// See [`BackendError`].
    Backend(BackendError),
}

impl Error {
    /// Returns the usage error, if this is one.
    #[inline]
    pub fn as_usage(&self) -> Option<&UsageError> {
        match self {
            Error::Usage(err) => Some(err),
            Error::Backend(_) => None,
        }
    }

    /// Returns the backend error, if this is one.
    #[inline]
    pub fn as_backend(&self) -> Option<&BackendError> {
        match self {
            Error::Usage(_) => None,
            Error::Backend(err) => Some(err),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Usage(err) => write!(f, "usage error: {err}"),
            Error::Backend(err) => write!(f, "backend error: {err}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Usage(err) => Some(err),
            Error::Backend(err) => Some(err),
        }
    }
}

impl From<UsageError> for Error {
    #[inline]
    fn from(err: UsageError) -> Self {
        Error::Usage(err)
    }
}

impl From<BackendError> for Error {
    #[inline]
    fn from(err: BackendError) -> Self {
        Error::Backend(err)
    }
}
