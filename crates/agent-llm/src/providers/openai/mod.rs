use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::provider::{LLMError, LLMProvider, LLMStream, RequestOptions, Result, ToolChoice};
use crate::types::LLMChunk;
use agent_core::{tools::ToolSchema, Message};

use super::common::openai_compat::{build_openai_compat_body, parse_openai_compat_sse_data};
use super::common::sse::llm_stream_from_sse;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Default sampling temperature, used when a request does not set one.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Bound connection setup and the whole streamed response.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|error| {
                log::warn!("Failed to build HTTP client with timeout: {}", error);
                Client::new()
            });
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        tool_choice: Option<ToolChoice>,
        options: &RequestOptions,
    ) -> Result<LLMStream> {
        // Use provided model or fall back to default
        let model_to_use = options.model.as_deref().unwrap_or(&self.model);

        if options.model.is_some() {
            log::debug!(
                "OpenAI provider using override model '{}' (default: '{}')",
                model_to_use,
                self.model
            );
        }

        let options = RequestOptions {
            temperature: options.temperature.or(self.temperature),
            ..options.clone()
        };
        let body = build_openai_compat_body(model_to_use, messages, tools, tool_choice, &options);

        log::debug!(
            "POST {}/chat/completions ({} messages, {} tools)",
            self.base_url,
            messages.len(),
            tools.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    LLMError::Auth(format!("HTTP {}: {}", status, text))
                }
                _ => LLMError::Api(format!("HTTP {}: {}", status, text)),
            });
        }

        let stream = llm_stream_from_sse(response, |data| {
            if data.trim().is_empty() {
                return Ok(Vec::new());
            }

            let mut chunks = parse_openai_compat_sse_data(data)?;
            chunks.retain(|chunk| *chunk != LLMChunk::Done);
            Ok(chunks)
        });

        Ok(stream)
    }
}
