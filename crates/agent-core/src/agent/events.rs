use crate::tools::ToolResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Token {
        content: String,
    },

    ToolStart {
        tool_call_id: String,
        tool_name: String,
        arguments: serde_json::Value,
    },

    ToolComplete {
        tool_call_id: String,
        result: ToolResult,
    },

    ToolError {
        tool_call_id: String,
        error: String,
    },

    /// Emitted before each backend call with the estimated size of the window
    TokenBudgetUpdated {
        usage: TokenBudgetUsage,
    },

    Complete {
        usage: TokenUsage,
    },

    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Estimated context usage for one backend call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBudgetUsage {
    /// Estimated cost of the system message
    pub system_tokens: u32,
    /// Estimated cost of everything sent after the system message
    pub window_tokens: u32,
    /// Estimated total sent
    pub total_tokens: u32,
    /// Configured budget
    pub budget_limit: u32,
    /// Whether older messages were left out
    pub truncation_occurred: bool,
    /// Number of history messages left out
    pub messages_dropped: usize,
}
