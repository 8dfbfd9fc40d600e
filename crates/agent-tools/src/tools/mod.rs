pub mod weather;

pub use weather::{
    WeatherReport, WeatherTool, WeatherUnits, DEFAULT_LOCATION, DEFAULT_WEATHER_BASE_URL,
    WEATHER_TOOL_NAME,
};
