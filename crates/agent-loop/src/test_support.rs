//! Scripted model backend and stub capabilities for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;

use agent_core::tools::{ToolCallDelta, ToolError, ToolSchema};
use agent_core::{Message, Tool};
use agent_llm::provider::Result as LLMResult;
use agent_llm::{LLMChunk, LLMError, LLMProvider, LLMStream, RequestOptions, ToolChoice};

pub enum Reply {
    Chunks(Vec<LLMChunk>),
    Delayed(Vec<LLMChunk>, Duration),
    Fail(String),
}

pub fn answer(text: &str) -> Reply {
    Reply::Chunks(vec![LLMChunk::Token(text.to_string()), LLMChunk::Done])
}

pub fn slow_answer(text: &str, delay: Duration) -> Reply {
    Reply::Delayed(vec![LLMChunk::Token(text.to_string())], delay)
}

fn tool_deltas(calls: &[(&str, &str, &str)]) -> LLMChunk {
    LLMChunk::ToolCalls(
        calls
            .iter()
            .enumerate()
            .map(|(index, (id, name, arguments))| ToolCallDelta {
                index,
                id: Some(id.to_string()),
                name: Some(name.to_string()),
                arguments: Some(arguments.to_string()),
            })
            .collect(),
    )
}

/// Phase 1 reply requesting `(id, name, arguments)` invocations.
pub fn tool_request(calls: &[(&str, &str, &str)]) -> Reply {
    Reply::Chunks(vec![tool_deltas(calls), LLMChunk::Done])
}

pub fn answer_with_tool_request(text: &str, calls: &[(&str, &str, &str)]) -> Reply {
    Reply::Chunks(vec![
        LLMChunk::Token(text.to_string()),
        tool_deltas(calls),
        LLMChunk::Done,
    ])
}

pub fn backend_down() -> Reply {
    Reply::Fail("HTTP 503 Service Unavailable: overloaded".to_string())
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
    pub tool_choice: Option<ToolChoice>,
    pub options: RequestOptions,
}

/// Replays one [`Reply`] per call and records what it was sent.
pub struct ScriptedLLM {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedLLM {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> RecordedRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedLLM {
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        tool_choice: Option<ToolChoice>,
        options: &RequestOptions,
    ) -> LLMResult<LLMStream> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: messages.to_vec(),
            tool_names: tools.iter().map(|t| t.function.name.clone()).collect(),
            tool_choice,
            options: options.clone(),
        });

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Chunks(chunks)) => Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok)))),
            Some(Reply::Delayed(chunks, delay)) => {
                tokio::time::sleep(delay).await;
                Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
            }
            Some(Reply::Fail(message)) => Err(LLMError::Api(message)),
            None => Err(LLMError::Api("script exhausted".to_string())),
        }
    }
}

/// Returns a fixed payload and remembers the arguments it was called with.
pub struct CountingTool {
    name: String,
    payload: Value,
    seen_args: Arc<Mutex<Vec<Value>>>,
}

impl CountingTool {
    pub fn new(name: &str, payload: Value) -> Self {
        Self {
            name: name.to_string(),
            payload,
            seen_args: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn seen_args(&self) -> Arc<Mutex<Vec<Value>>> {
        self.seen_args.clone()
    }
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "test capability"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        self.seen_args.lock().unwrap().push(args);
        Ok(self.payload.clone())
    }
}

pub struct FailingTool {
    name: String,
    error: ToolError,
}

impl FailingTool {
    pub fn not_found(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            error: ToolError::ResourceNotFound(message.to_string()),
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "always fails"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        Err(self.error.clone())
    }
}
