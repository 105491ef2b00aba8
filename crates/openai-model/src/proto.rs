use chatbridge_model::{self as model, FunctionDefinition, ModelRequest};
use serde::{Deserialize, Serialize};

use crate::OpenAIConfig;

// ------------------------------------
// Types shared by requests and replies
// ------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Function,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    // `null` when the assistant only asks for a function call.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatCompletion {
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Choice {
    pub message: Message,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub id: String,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChunkChoice {
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Delta {
    pub content: Option<String>,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    functions: Vec<FunctionDefinition>,
    max_tokens: u32,
    stream: bool,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(
    req: &ModelRequest,
    config: &OpenAIConfig,
    stream: bool,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: config.model.clone(),
        messages: req.messages.iter().map(to_wire).collect(),
        functions: req.functions.clone(),
        max_tokens: config.max_tokens,
        stream,
    }
}

pub fn to_wire(msg: &model::Message) -> Message {
    let role = match msg.role {
        model::Role::System => Role::System,
        model::Role::User => Role::User,
        model::Role::Assistant => Role::Assistant,
        model::Role::Function => Role::Function,
    };
    let content = if msg.content.is_empty() && msg.function_call.is_some() {
        None
    } else {
        Some(msg.content.clone())
    };
    Message {
        role,
        content,
        function_call: msg.function_call.as_ref().map(|call| FunctionCall {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        }),
        name: msg.name.clone(),
    }
}

pub fn from_wire(msg: Message) -> model::Message {
    let role = match msg.role {
        Role::System => model::Role::System,
        Role::User => model::Role::User,
        Role::Assistant => model::Role::Assistant,
        Role::Function => model::Role::Function,
    };
    model::Message {
        role,
        content: msg.content.unwrap_or_default(),
        function_call: msg.function_call.map(|call| model::FunctionCall {
            name: call.name,
            arguments: call.arguments,
        }),
        name: msg.name,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::OpenAIConfigBuilder;

    #[test]
    fn test_create_request() {
        let request = ModelRequest {
            messages: vec![
                model::Message::system("You are a helpful assistant."),
                model::Message::user("Hello"),
            ],
            functions: vec![FunctionDefinition {
                name: "shell".to_owned(),
                description: Some("Runs shell commands.".to_owned()),
                parameters: json!({
                    "type": "object",
                    "properties": { "cmd": { "type": "string" } }
                }),
                extra: Default::default(),
            }],
        };
        let config = OpenAIConfigBuilder::with_api_key("xxx")
            .with_model("custom")
            .build()
            .unwrap();
        let expected = json!({
            "model": "custom",
            "messages": [
                { "role": "system", "content": "You are a helpful assistant." },
                { "role": "user", "content": "Hello" }
            ],
            "functions": [{
                "name": "shell",
                "description": "Runs shell commands.",
                "parameters": {
                    "type": "object",
                    "properties": { "cmd": { "type": "string" } }
                }
            }],
            "max_tokens": 2000,
            "stream": true
        });
        let actual =
            serde_json::to_value(create_request(&request, &config, true))
                .unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_functions_omitted_when_empty() {
        let request = ModelRequest {
            messages: vec![model::Message::user("Hello")],
            functions: vec![],
        };
        let config = OpenAIConfigBuilder::with_api_key("xxx").build().unwrap();
        let actual =
            serde_json::to_value(create_request(&request, &config, false))
                .unwrap();
        assert!(actual.get("functions").is_none());
        assert_eq!(actual["stream"], json!(false));
    }

    #[test]
    fn test_functions_sent_as_declared() {
        let declared = json!([{ "name": "now", "strict": true }]);
        let request = ModelRequest {
            messages: vec![model::Message::user("What time is it?")],
            functions: model::parse_function_schema(&declared.to_string())
                .unwrap(),
        };
        let config = OpenAIConfigBuilder::with_api_key("xxx").build().unwrap();
        let actual =
            serde_json::to_value(create_request(&request, &config, false))
                .unwrap();
        assert_eq!(actual["functions"], declared);
    }

    #[test]
    fn test_round_trip() {
        let messages = [
            model::Message::system("Be brief."),
            model::Message::user("What's the weather in Paris?"),
            model::Message::assistant("").with_function_call(
                model::FunctionCall {
                    name: "get_weather".to_owned(),
                    arguments: r#"{"city":"Paris"}"#.to_owned(),
                },
            ),
            model::Message::assistant("Let me check.").with_function_call(
                model::FunctionCall {
                    name: "get_weather".to_owned(),
                    arguments: String::new(),
                },
            ),
            model::Message::function("get_weather", "sunny"),
            model::Message::assistant(""),
            model::Message::assistant("It's sunny."),
        ];
        for msg in messages {
            assert_eq!(from_wire(to_wire(&msg)), msg);
        }
    }

    #[test]
    fn test_absent_function_call_stays_absent() {
        let wire = to_wire(&model::Message::assistant("Hi"));
        assert_eq!(wire.function_call, None);
        let value = serde_json::to_value(&wire).unwrap();
        assert!(value.get("function_call").is_none());

        let wire: Message = serde_json::from_value(json!({
            "role": "assistant",
            "content": null,
            "function_call": { "name": "now", "arguments": "{}" }
        }))
        .unwrap();
        let msg = from_wire(wire);
        assert_eq!(msg.content, "");
        assert_eq!(msg.function_call.unwrap().name, "now");

        let wire: Message = serde_json::from_value(json!({
            "role": "assistant",
            "content": "Hi"
        }))
        .unwrap();
        assert_eq!(from_wire(wire).function_call, None);
    }
}
