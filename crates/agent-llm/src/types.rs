use agent_core::tools::ToolCallDelta;

/// One decoded piece of a streamed model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LLMChunk {
    Token(String),
    ToolCalls(Vec<ToolCallDelta>),
    Done,
}
