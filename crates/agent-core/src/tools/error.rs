use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("unknown capability {0}")]
    UnknownCapability(String),

    #[error("Malformed arguments: {0}")]
    MalformedArguments(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Not found: {0}")]
    ResourceNotFound(String),

    #[error("Execution failed: {0}")]
    Execution(String),
}

pub type Result<T> = std::result::Result<T, ToolError>;
