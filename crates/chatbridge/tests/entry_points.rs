use std::time::Duration;

use chatbridge::core::{ModelClient, StreamState, UsageError};
use chatbridge::model::{FunctionCall, Message};
use chatbridge::{
    CallOptions, CallParams, MemoryParams, Output, chain_call, chat_memory,
    memory_store,
};
use chatbridge_test_model::{PresetEvent, PresetResponse, TestModelProvider};
use tokio::time::{sleep, timeout};

fn session(id: &str) -> MemoryParams {
    MemoryParams {
        session_id: Some(id.to_owned()),
    }
}

#[test]
fn test_chat_memory_sessions() {
    let first = chat_memory(session("entry-points-shared"));
    let second = chat_memory(session("entry-points-shared"));
    first.append(Message::user("hi"));
    assert!(first.same_session(&second));
    assert_eq!(second.history(), [Message::user("hi")]);
    assert_eq!(
        memory_store().history("entry-points-shared"),
        [Message::user("hi")]
    );

    let anonymous = chat_memory(MemoryParams::default());
    let empty = chat_memory(session(""));
    assert!(!anonymous.same_session(&empty));
    assert_eq!(anonymous.session_id(), None);
}

#[tokio::test]
async fn test_non_streaming_call() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_deltas(["hello!"]));
    let memory = chat_memory(session("entry-points-non-streaming"));

    let params = CallParams::new(ModelClient::new(provider))
        .with_memory(memory.clone())
        .with_prompt("hi");
    let output = chain_call(params).await.unwrap();

    let Output::Text(text) = output.default else {
        panic!("expected text output");
    };
    assert_eq!(text, "hello!");
    assert_eq!(output.function_call, None);
    assert_eq!(
        memory.history(),
        [Message::user("hi"), Message::assistant("hello!")]
    );
}

#[tokio::test]
async fn test_function_call() {
    let provider = TestModelProvider::default();
    let call = FunctionCall {
        name: "get_weather".to_owned(),
        arguments: r#"{"city":"Paris"}"#.to_owned(),
    };
    provider.add_response(PresetResponse::with_events([
        PresetEvent::FunctionCall(call.clone()),
    ]));

    let params = CallParams::new(ModelClient::new(provider.clone()))
        .with_prompt("Weather in Paris?")
        .with_functions(
            r#"[{"name":"get_weather","parameters":{"type":"object"}}]"#,
        );
    let output = chain_call(params).await.unwrap();
    assert_eq!(output.function_call, Some(call));
    assert_eq!(provider.requests()[0].functions[0].name, "get_weather");
}

#[tokio::test]
async fn test_streaming_call() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_deltas(["Hel", "lo, ", "world"]));
    let memory = chat_memory(MemoryParams::default());

    let options: CallOptions =
        serde_json::from_str(r#"{"prompt": "greet me", "stream": true}"#)
            .unwrap();
    let params = CallParams::new(ModelClient::new(provider))
        .with_memory(memory.clone())
        .with_options(options);
    let output = chain_call(params).await.unwrap();
    assert_eq!(output.function_call, None);

    let Output::Stream(handle) = output.default else {
        panic!("expected stream output");
    };
    assert_eq!(handle.clone().wait().await.unwrap(), "Hello, world");
    assert_eq!(handle.state(), StreamState::Done);

    timeout(Duration::from_millis(500), async {
        while memory.len() < 2 {
            sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(memory.history()[1], Message::assistant("Hello, world"));
}

#[tokio::test]
async fn test_missing_prompt() {
    let provider = TestModelProvider::default();
    let memory = chat_memory(MemoryParams::default());

    let params =
        CallParams::new(ModelClient::new(provider.clone())).with_memory(memory.clone());
    let err = chain_call(params).await.unwrap_err();
    assert_eq!(err.as_usage(), Some(&UsageError::MissingPrompt));
    assert_eq!(provider.request_count(), 0);
    assert!(memory.is_empty());
}
