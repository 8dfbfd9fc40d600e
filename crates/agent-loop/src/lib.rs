pub mod config;
pub mod orchestrator;
pub mod stream;
pub mod turn;

pub use config::{AgentLoopConfig, DEFAULT_SYSTEM_PROMPT, DEFAULT_TOKEN_BUDGET};
pub use orchestrator::{OrchestratorOutcome, ToolOrchestrator};
pub use turn::{
    ChatSession, ConfirmationReply, TurnOutcome, TurnState, ACKNOWLEDGEMENT, FOLLOW_UP_QUESTION,
    MORE_INFO_REQUEST, REPROMPT,
};

#[cfg(test)]
mod test_support;
