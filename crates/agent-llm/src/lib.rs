pub mod provider;
pub mod providers;
pub mod types;

pub use provider::{LLMError, LLMProvider, LLMStream, RequestOptions, ToolChoice};
pub use providers::OpenAIProvider;
pub use types::LLMChunk;
