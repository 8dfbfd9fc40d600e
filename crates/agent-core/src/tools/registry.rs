use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::tools::{FunctionSchema, ToolError, ToolSchema};

/// A named capability the model may request.
///
/// Implementations own their argument validation and defaulting; they return
/// structured data on success and a [`ToolError`] otherwise.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;

    fn to_schema(&self) -> ToolSchema {
        ToolSchema {
            schema_type: "function".to_string(),
            function: FunctionSchema {
                name: self.name().to_string(),
                description: self.description().to_string(),
                parameters: self.parameters_schema(),
            },
        }
    }
}

pub type SharedTool = Arc<dyn Tool>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool with name '{0}' already registered")]
    DuplicateTool(String),

    #[error("invalid tool: {0}")]
    InvalidTool(String),
}

/// Capabilities available to the orchestrator.
///
/// Filled at startup and then shared read-only (typically as
/// `Arc<ToolRegistry>`) by every session.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, SharedTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&mut self, tool: T) -> Result<(), RegistryError>
    where
        T: Tool + 'static,
    {
        self.register_shared(Arc::new(tool))
    }

    pub fn register_shared(&mut self, tool: SharedTool) -> Result<(), RegistryError> {
        let name = tool.name();

        if name.trim().is_empty() {
            return Err(RegistryError::InvalidTool(
                "tool name cannot be empty".to_string(),
            ));
        }

        // the advertised name must be the lookup key
        if name != name.trim() {
            return Err(RegistryError::InvalidTool(format!(
                "tool name '{}' has surrounding whitespace",
                name
            )));
        }

        if self.tools.contains_key(name) {
            return Err(RegistryError::DuplicateTool(name.to_string()));
        }

        self.tools.insert(name.to_string(), tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<SharedTool> {
        self.tools.get(name).map(Arc::clone)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Dispatch by name. Unknown names are an error value, never a panic.
    pub async fn invoke(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownCapability(name.to_string()))?;
        tool.execute(args).await
    }

    /// Descriptors sorted by name.
    pub fn list_tools(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|tool| tool.to_schema()).collect()
    }

    pub fn list_tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.list_tool_names())
            .finish()
    }
}
