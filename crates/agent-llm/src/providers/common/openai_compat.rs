//! OpenAI-compatible request serialization helpers.
//!
//! Builds a chat completions body without leaking internal
//! `agent_core::Message` fields (like `id` / `created_at`), and decodes the
//! streamed `data:` payloads back into [`LLMChunk`]s.

use agent_core::tools::{ToolCallDelta, ToolSchema};
use agent_core::Message;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::provider::{RequestOptions, Result, ToolChoice};
use crate::types::LLMChunk;

/// Convert internal [`Message`] values to an OpenAI-compatible JSON array.
pub fn messages_to_openai_compat_json(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            // assistant turns that only request tools carry `null` content
            let content = if m.content.is_empty() && m.has_tool_calls() {
                Value::Null
            } else {
                json!(m.content)
            };

            let mut msg = json!({
                "role": m.role.as_str(),
                "content": content,
            });

            if let Some(tool_call_id) = &m.tool_call_id {
                msg["tool_call_id"] = json!(tool_call_id);
            }

            if let Some(tool_calls) = m.tool_calls.as_ref().filter(|calls| !calls.is_empty()) {
                msg["tool_calls"] = json!(tool_calls);
            }

            msg
        })
        .collect()
}

/// Convert internal [`ToolSchema`] values to the OpenAI `tools` array JSON.
pub fn tools_to_openai_compat_json(tools: &[ToolSchema]) -> Vec<Value> {
    tools.iter().map(|t| json!(t)).collect()
}

/// Build a streaming chat request body.
///
/// `tools` and `tool_choice` are only sent when at least one tool is offered;
/// the API rejects an empty `tools` array.
pub fn build_openai_compat_body(
    model: &str,
    messages: &[Message],
    tools: &[ToolSchema],
    tool_choice: Option<ToolChoice>,
    options: &RequestOptions,
) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages_to_openai_compat_json(messages),
        "stream": true,
    });

    if !tools.is_empty() {
        body["tools"] = json!(tools_to_openai_compat_json(tools));
        if let Some(tool_choice) = tool_choice {
            body["tool_choice"] = tool_choice.to_value();
        }
    }

    if let Some(temperature) = options.temperature {
        body["temperature"] = json!(temperature);
    }

    if let Some(max_tokens) = options.max_output_tokens {
        body["max_tokens"] = json!(max_tokens);
    }

    body
}

// --- OpenAI-compatible streaming chunk parsing ---

#[derive(Debug, Deserialize)]
pub struct OpenAICompatStreamChunk {
    #[allow(dead_code)]
    id: Option<String>,
    #[serde(default)]
    choices: Vec<OpenAICompatChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAICompatChoice {
    #[serde(default)]
    delta: OpenAICompatDelta,
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct OpenAICompatDelta {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAICompatToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct OpenAICompatToolCallDelta {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<OpenAICompatFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct OpenAICompatFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

/// Convert a single OpenAI-compatible stream chunk into [`LLMChunk`]s.
///
/// A delta may carry text and tool-call fragments at once; the text is
/// emitted first. Empty deltas yield nothing.
pub fn parse_openai_compat_chunk(chunk: OpenAICompatStreamChunk) -> Vec<LLMChunk> {
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Vec::new();
    };

    let mut out = Vec::new();
    if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
        out.push(LLMChunk::Token(content));
    }

    if let Some(tool_calls) = choice.delta.tool_calls {
        let deltas: Vec<ToolCallDelta> = tool_calls
            .into_iter()
            .map(|tc| {
                let (name, arguments) = tc
                    .function
                    .map(|f| (f.name, f.arguments))
                    .unwrap_or((None, None));
                ToolCallDelta {
                    index: tc.index,
                    id: tc.id,
                    name,
                    arguments,
                }
            })
            .collect();

        if !deltas.is_empty() {
            out.push(LLMChunk::ToolCalls(deltas));
        }
    }

    out
}

/// Parse an SSE `data:` payload.
///
/// - `"[DONE]"` -> `[LLMChunk::Done]`
/// - Invalid JSON -> error
pub fn parse_openai_compat_sse_data(data: &str) -> Result<Vec<LLMChunk>> {
    if data.trim() == "[DONE]" {
        return Ok(vec![LLMChunk::Done]);
    }

    let chunk: OpenAICompatStreamChunk = serde_json::from_str(data)?;
    Ok(parse_openai_compat_chunk(chunk))
}
