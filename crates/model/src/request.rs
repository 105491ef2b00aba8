use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Message;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelRequest {
    /// The input messages, oldest first.
    pub messages: Vec<Message>,
    /// Functions that the model may ask to call.
    pub functions: Vec<FunctionDefinition>,
}

/// Declares a function that can be called by the model.
///
/// Definitions are supplied by the caller and handed to the backend as
/// they are. This layer doesn't interpret them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Name of the function.
    pub name: String,
    /// Description of the function.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parameters definition of the function.
    ///
    /// For most model providers, the parameters should typically be
    /// defined by a [JSON schema](https://json-schema.org/).
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub parameters: Value,
    /// Any other keys of the declaration, such as `strict`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An ordered list of function declarations.
pub type FunctionSchema = Vec<FunctionDefinition>;

/// Decodes a serialized JSON array of function declarations.
#[inline]
pub fn parse_function_schema(
    text: &str,
) -> Result<FunctionSchema, serde_json::Error> {
    serde_json::from_str(text)
}
