use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::agent::types::Message;

/// A model-issued request to invoke a named capability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON text as produced by the model; may be empty or malformed.
    pub arguments: String,
}

/// Capability descriptor in the OpenAI `tools` shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub function: FunctionSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Outcome of one capability invocation, success or structured error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub tool_name: String,
    pub payload: Value,
}

impl ToolResult {
    pub fn success(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            payload,
        }
    }

    /// Result whose payload is `{"error": message}`.
    pub fn error(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            payload: json!({ "error": message.into() }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.payload.get("error").is_some()
    }

    /// The `role=tool` history entry carrying the serialized payload.
    pub fn to_message(&self) -> Message {
        Message::tool_result(self.tool_call_id.clone(), self.payload.to_string())
    }
}
