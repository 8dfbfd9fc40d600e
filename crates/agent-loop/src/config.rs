use std::sync::Arc;
use std::time::Duration;

use agent_core::budget::SharedTokenCounter;
use agent_core::HeuristicTokenCounter;
use agent_llm::RequestOptions;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const DEFAULT_TOKEN_BUDGET: u32 = 800;

/// Configuration for the orchestrator and chat sessions.
#[derive(Clone)]
pub struct AgentLoopConfig {
    /// Instruction message a new [`crate::ChatSession`] starts with.
    pub system_prompt: String,
    /// Overrides the provider's default model when set.
    pub model: Option<String>,
    /// Estimated-token budget for each window sent to the model.
    pub token_budget: u32,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    /// Deadline for each backend call, stream included.
    pub request_timeout: Option<Duration>,
    pub token_counter: SharedTokenCounter,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            model: None,
            token_budget: DEFAULT_TOKEN_BUDGET,
            temperature: None,
            max_output_tokens: None,
            request_timeout: None,
            token_counter: Arc::new(HeuristicTokenCounter::default()),
        }
    }
}

impl AgentLoopConfig {
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

impl std::fmt::Debug for AgentLoopConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentLoopConfig")
            .field("system_prompt", &self.system_prompt)
            .field("model", &self.model)
            .field("token_budget", &self.token_budget)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}
