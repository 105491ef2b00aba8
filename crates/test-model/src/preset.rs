use chatbridge_model::FunctionCall;
use serde::{Deserialize, Serialize};

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "message_delta")]
    MessageDelta(String),
    /// Only delivered through non-streaming completions.
    #[serde(rename = "function_call")]
    FunctionCall(FunctionCall),
    /// Aborts the response with the given message.
    #[serde(rename = "failure")]
    Failure(String),
}

/// The preset response for one request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the request itself fails with this message before any
    /// event is produced.
    pub rejection: Option<String>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            rejection: None,
        }
    }

    /// Creates a `PresetResponse` streaming the given fragments.
    #[inline]
    pub fn with_deltas<S: Into<String>>(
        deltas: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::with_events(
            deltas
                .into_iter()
                .map(|d| PresetEvent::MessageDelta(d.into()))
                .collect::<Vec<_>>(),
        )
    }

    /// Creates a `PresetResponse` whose request is rejected by the
    /// backend.
    #[inline]
    pub fn rejected<S: Into<String>>(message: S) -> Self {
        Self {
            events: vec![],
            rejection: Some(message.into()),
        }
    }
}
