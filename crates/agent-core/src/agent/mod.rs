pub mod error;
pub mod events;
pub mod types;

pub use error::AgentError;
pub use events::{AgentEvent, TokenBudgetUsage, TokenUsage};
pub use types::{Conversation, Message, Role};
