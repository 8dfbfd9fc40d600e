use thiserror::Error;

use crate::tools::ToolError;

#[derive(Error, Debug)]
pub enum AgentError {
    /// Transport failure, non-success status or timeout from the model backend.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Malformed arguments: {0}")]
    MalformedArguments(String),

    #[error("Invalid reply '{0}': expected yes or no")]
    InvalidUserReply(String),
}

impl AgentError {
    /// Errors the orchestrator absorbs locally instead of handing to the caller.
    pub fn is_locally_recoverable(&self) -> bool {
        matches!(
            self,
            AgentError::UnknownCapability(_)
                | AgentError::MalformedArguments(_)
                | AgentError::InvalidUserReply(_)
        )
    }
}

impl From<ToolError> for AgentError {
    fn from(error: ToolError) -> Self {
        match error {
            ToolError::UnknownCapability(name) => AgentError::UnknownCapability(name),
            ToolError::MalformedArguments(reason) => AgentError::MalformedArguments(reason),
            ToolError::AuthenticationFailed(reason) => AgentError::AuthenticationFailed(reason),
            ToolError::ResourceNotFound(reason) => AgentError::ResourceNotFound(reason),
            ToolError::Execution(reason) => AgentError::BackendUnavailable(reason),
        }
    }
}
