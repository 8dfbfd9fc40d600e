pub mod agent;
pub mod budget;
pub mod tools;

pub use agent::events::{AgentEvent, TokenBudgetUsage, TokenUsage};
pub use agent::types::{Conversation, Message, Role};
pub use agent::AgentError;
pub use budget::{build_context_window, ContextWindow, HeuristicTokenCounter, TokenCounter};
pub use tools::{
    finalize_tool_calls, parse_tool_args, FunctionCall, FunctionSchema, RegistryError, Tool,
    ToolCall, ToolCallAccumulator, ToolError, ToolRegistry, ToolResult, ToolSchema,
};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
