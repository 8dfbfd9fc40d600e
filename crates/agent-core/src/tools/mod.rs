pub mod accumulator;
pub mod args;
pub mod error;
pub mod registry;
pub mod types;

pub use accumulator::{
    finalize_tool_calls, update_partial_tool_call, PartialToolCall, ToolCallAccumulator,
    ToolCallDelta,
};
pub use args::{parse_tool_args, parse_tool_args_or_default, string_arg};
pub use error::ToolError;
pub use registry::{RegistryError, SharedTool, Tool, ToolRegistry};
pub use types::{FunctionCall, FunctionSchema, ToolCall, ToolResult, ToolSchema};
