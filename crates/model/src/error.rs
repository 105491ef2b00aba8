use std::fmt::{self, Display, Formatter};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The backend rejected the credentials.
    Authentication,
    /// The model provider is rate limited.
    RateLimitExceeded,
    /// The backend answered with something that is not a usable
    /// response, e.g. an empty choice list.
    MalformedResponse,
    /// Translating between the canonical and the wire representation
    /// failed.
    Serialization,
    /// The operation is not supported by this backend.
    Unsupported,
    /// Any other errors, including transport failures.
    Other,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Authentication => write!(f, "authentication failed"),
            ErrorKind::RateLimitExceeded => write!(f, "rate limit exceeded"),
            ErrorKind::MalformedResponse => write!(f, "malformed response"),
            ErrorKind::Serialization => write!(f, "serialization error"),
            ErrorKind::Unsupported => write!(f, "unsupported operation"),
            ErrorKind::Other => write!(f, "backend error"),
        }
    }
}
