//! Built-in capabilities the model may request.
//!
//! Every capability implements [`agent_core::tools::Tool`] and is registered
//! into an [`agent_core::ToolRegistry`] once at startup.

pub mod tools;

use agent_core::tools::{RegistryError, ToolRegistry};

pub use tools::{
    WeatherReport, WeatherTool, WeatherUnits, DEFAULT_LOCATION, DEFAULT_WEATHER_BASE_URL,
    WEATHER_TOOL_NAME,
};

/// Registry holding the weather capability only.
pub fn weather_registry(tool: WeatherTool) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register(tool)?;
    Ok(registry)
}
