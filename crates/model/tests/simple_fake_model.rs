//! A minimal provider written against the public contract only: it answers
//! with a function call when the prompt matches a declared function, and
//! with a word-by-word echo otherwise.

use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::{poll_fn, ready};
use std::pin::{Pin, pin};
use std::task::{Context, Poll};

use chatbridge_model::{
    ErrorKind, FunctionCall, Message, ModelFinishReason, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent, Role,
    parse_function_schema,
};

#[derive(Debug)]
struct KeywordError(&'static str);

impl Display for KeywordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Error for KeywordError {}

impl ModelProviderError for KeywordError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Unsupported
    }
}

/// Replays a fixed list of events, one per poll.
struct Replay(VecDeque<ModelResponseEvent>);

impl ModelResponse for Replay {
    type Error = KeywordError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        Poll::Ready(Ok(self.get_mut().0.pop_front()))
    }
}

/// Calls a declared function whose name appears in the prompt.
struct KeywordProvider;

impl KeywordProvider {
    fn answer(req: &ModelRequest) -> Result<Message, KeywordError> {
        let prompt = req
            .messages
            .iter()
            .rfind(|msg| msg.role == Role::User)
            .map(|msg| msg.content.as_str())
            .ok_or(KeywordError("no user message"))?;

        let called = req
            .functions
            .iter()
            .find(|function| prompt.contains(function.name.as_str()));
        Ok(match called {
            Some(function) => Message::assistant("").with_function_call(
                FunctionCall {
                    name: function.name.clone(),
                    arguments: "{}".to_owned(),
                },
            ),
            None => Message::assistant(format!("echo: {prompt}")),
        })
    }
}

impl ModelProvider for KeywordProvider {
    type Error = KeywordError;
    type Response = Replay;

    fn supports_streaming(&self) -> bool {
        true
    }

    fn complete(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Message, Self::Error>> + Send + 'static
    {
        ready(Self::answer(req))
    }

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let replay = Self::answer(req).and_then(|msg| {
            if msg.function_call.is_some() {
                return Err(KeywordError("function calls are not streamed"));
            }
            let mut events: VecDeque<_> = msg
                .content
                .split_inclusive(' ')
                .map(|word| ModelResponseEvent::MessageDelta(word.to_owned()))
                .collect();
            events.push_back(ModelResponseEvent::Completed(
                ModelFinishReason::Stop,
            ));
            Ok(Replay(events))
        });
        ready(replay)
    }
}

fn request(prompt: &str) -> ModelRequest {
    ModelRequest {
        messages: vec![Message::system("Be brief."), Message::user(prompt)],
        functions: parse_function_schema(
            r#"[{"name": "get_time", "parameters": {"type": "object"}}]"#,
        )
        .unwrap(),
    }
}

#[tokio::test]
async fn test_streaming_completion() {
    let resp = KeywordProvider
        .send_request(&request("good morning"))
        .await
        .unwrap();
    let mut resp = pin!(resp);

    let mut deltas = vec![];
    let mut finish_reason = None;
    while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
        .await
        .unwrap()
    {
        match event {
            ModelResponseEvent::MessageDelta(delta) => deltas.push(delta),
            ModelResponseEvent::Completed(reason) => finish_reason = Some(reason),
        }
    }

    assert_eq!(deltas, ["echo: ", "good ", "morning"]);
    assert_eq!(finish_reason, Some(ModelFinishReason::Stop));
}

#[tokio::test]
async fn test_function_call() {
    let msg = KeywordProvider
        .complete(&request("call get_time please"))
        .await
        .unwrap();
    assert_eq!(msg.role, Role::Assistant);
    assert_eq!(msg.content, "");
    assert_eq!(msg.function_call.unwrap().name, "get_time");

    let err = KeywordProvider
        .send_request(&request("get_time"))
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[tokio::test]
async fn test_missing_user_message() {
    let err = KeywordProvider
        .complete(&ModelRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "no user message");
}
