use crate::types::LLMChunk;
use agent_core::{tools::ToolSchema, AgentError, Message};
use async_trait::async_trait;
use futures::Stream;
use serde_json::{json, Value};
use std::pin::Pin;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Authentication error: {0}")]
    Auth(String),
}

pub type Result<T> = std::result::Result<T, LLMError>;

pub type LLMStream = Pin<Box<dyn Stream<Item = Result<LLMChunk>> + Send>>;

impl From<LLMError> for AgentError {
    fn from(error: LLMError) -> Self {
        match error {
            LLMError::Auth(message) => AgentError::AuthenticationFailed(message),
            other => AgentError::BackendUnavailable(other.to_string()),
        }
    }
}

/// Tool invocation mode sent alongside offered tools. The model decides
/// whether to call one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
}

impl ToolChoice {
    pub fn to_value(self) -> Value {
        match self {
            ToolChoice::Auto => json!("auto"),
        }
    }
}

/// Per-request knobs. `None` fields fall back to the provider defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Stream chat completion
    ///
    /// # Arguments
    /// * `messages` - Chat messages, system message first
    /// * `tools` - Capability descriptors offered to the model (may be empty)
    /// * `tool_choice` - Tool invocation mode; omitted from the request when `None`
    /// * `options` - Model override, temperature and output limit
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        tool_choice: Option<ToolChoice>,
        options: &RequestOptions,
    ) -> Result<LLMStream>;
}
