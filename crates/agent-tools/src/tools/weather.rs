//! Current-weather lookup backed by the OpenWeatherMap REST API.
//!
//! Exposed to the model as `get_current_weather`. A blank or missing
//! location falls back to the configured default location, and missing or
//! unrecognised units fall back to the configured default units.
//!
//! Upstream status mapping:
//! - 401 -> [`ToolError::AuthenticationFailed`]
//! - 404 -> [`ToolError::ResourceNotFound`]
//! - any other non-2xx, transport failure or unreadable body -> [`ToolError::Execution`]

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use agent_core::tools::{string_arg, Tool, ToolError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const WEATHER_TOOL_NAME: &str = "get_current_weather";
pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.openweathermap.org";
pub const DEFAULT_LOCATION: &str = "Syracuse, NY, US";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherUnits {
    /// Fahrenheit
    #[default]
    Imperial,
    /// Celsius
    Metric,
}

impl WeatherUnits {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherUnits::Imperial => "imperial",
            WeatherUnits::Metric => "metric",
        }
    }
}

impl fmt::Display for WeatherUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeatherUnits {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "imperial" => Ok(WeatherUnits::Imperial),
            "metric" => Ok(WeatherUnits::Metric),
            other => Err(format!("unsupported units '{other}'")),
        }
    }
}

/// Payload returned to the model and shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub location: String,
    pub units: WeatherUnits,
    pub description: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: f64,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentWeatherResponse {
    #[serde(default)]
    main: MainReadings,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Default, Deserialize)]
struct MainReadings {
    temp: Option<f64>,
    feels_like: Option<f64>,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    message: Option<String>,
}

fn round2(value: Option<f64>) -> f64 {
    (value.unwrap_or(0.0) * 100.0).round() / 100.0
}

impl WeatherReport {
    fn from_response(location: &str, units: WeatherUnits, response: CurrentWeatherResponse) -> Self {
        let description = response
            .weather
            .into_iter()
            .next()
            .and_then(|condition| condition.description)
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            location: location.to_string(),
            units,
            description,
            temperature: round2(response.main.temp),
            feels_like: round2(response.main.feels_like),
            temp_min: round2(response.main.temp_min),
            temp_max: round2(response.main.temp_max),
            humidity: round2(response.main.humidity),
        }
    }
}

pub struct WeatherTool {
    client: Client,
    api_key: String,
    base_url: String,
    default_location: String,
    default_units: WeatherUnits,
}

impl WeatherTool {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_client(DEFAULT_TIMEOUT),
            api_key: api_key.into(),
            base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
            default_location: DEFAULT_LOCATION.to_string(),
            default_units: WeatherUnits::default(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_default_location(mut self, location: impl Into<String>) -> Self {
        let location = location.into();
        if !location.trim().is_empty() {
            self.default_location = location.trim().to_string();
        }
        self
    }

    pub fn with_default_units(mut self, units: WeatherUnits) -> Self {
        self.default_units = units;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    pub fn default_location(&self) -> &str {
        &self.default_location
    }

    pub fn default_units(&self) -> WeatherUnits {
        self.default_units
    }

    /// Apply the documented fallbacks to model-supplied arguments.
    pub fn resolve_args(&self, args: &Value) -> (String, WeatherUnits) {
        let location = string_arg(args, "location")
            .map(str::to_string)
            .unwrap_or_else(|| self.default_location.clone());

        let units = match string_arg(args, "units") {
            Some(raw) => raw.parse().unwrap_or_else(|error| {
                log::warn!("{}; using {}", error, self.default_units);
                self.default_units
            }),
            None => self.default_units,
        };

        (location, units)
    }

    pub async fn lookup(
        &self,
        location: &str,
        units: WeatherUnits,
    ) -> Result<WeatherReport, ToolError> {
        log::debug!("Weather lookup for '{}' ({})", location, units);

        let response = self
            .client
            .get(format!("{}/data/2.5/weather", self.base_url))
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", units.as_str()),
            ])
            .send()
            .await
            .map_err(|error| ToolError::Execution(format!("weather lookup failed: {error}")))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(ToolError::AuthenticationFailed(
                "Invalid API key (401 Unauthorized)".to_string(),
            )),
            StatusCode::NOT_FOUND => {
                let message = response
                    .json::<UpstreamError>()
                    .await
                    .ok()
                    .and_then(|body| body.message)
                    .unwrap_or_else(|| "location not found".to_string());
                Err(ToolError::ResourceNotFound(message))
            }
            status if status.is_success() => {
                let body: CurrentWeatherResponse = response.json().await.map_err(|error| {
                    ToolError::Execution(format!("weather lookup failed: {error}"))
                })?;
                Ok(WeatherReport::from_response(location, units, body))
            }
            status => Err(ToolError::Execution(format!(
                "weather lookup failed: HTTP {status}"
            ))),
        }
    }
}

fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|error| {
            log::warn!("Failed to build HTTP client with timeout: {}", error);
            Client::new()
        })
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        WEATHER_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Get the current weather for a given location (city/region/country)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": format!(
                        "Location like 'Syracuse, NY, US' or 'Lima, Peru'. If missing/empty, default to {}.",
                        self.default_location
                    ),
                },
                "units": {
                    "type": "string",
                    "enum": ["imperial", "metric"],
                    "description": "imperial = Fahrenheit, metric = Celsius",
                },
            },
            "required": ["location"],
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let (location, units) = self.resolve_args(&args);
        let report = self.lookup(&location, units).await?;
        serde_json::to_value(report)
            .map_err(|error| ToolError::Execution(format!("failed to encode weather report: {error}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn syracuse_body() -> Value {
        json!({
            "weather": [{ "main": "Clear", "description": "clear sky" }],
            "main": {
                "temp": 45.0,
                "feels_like": 41.237,
                "temp_min": 43.004,
                "temp_max": 47.1,
                "humidity": 62
            },
            "name": "Syracuse"
        })
    }

    fn tool_for(server: &MockServer) -> WeatherTool {
        WeatherTool::new("test-key").with_base_url(server.uri())
    }

    #[tokio::test]
    async fn lookup_maps_and_rounds_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "Syracuse, NY, US"))
            .and(query_param("appid", "test-key"))
            .and(query_param("units", "imperial"))
            .respond_with(ResponseTemplate::new(200).set_body_json(syracuse_body()))
            .mount(&server)
            .await;

        let report = tool_for(&server)
            .lookup("Syracuse, NY, US", WeatherUnits::Imperial)
            .await
            .expect("report");

        assert_eq!(
            report,
            WeatherReport {
                location: "Syracuse, NY, US".to_string(),
                units: WeatherUnits::Imperial,
                description: "clear sky".to_string(),
                temperature: 45.0,
                feels_like: 41.24,
                temp_min: 43.0,
                temp_max: 47.1,
                humidity: 62.0,
            }
        );
    }

    #[tokio::test]
    async fn missing_fields_default_to_zero_and_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let report = tool_for(&server)
            .lookup("Lima, Peru", WeatherUnits::Metric)
            .await
            .expect("report");

        assert_eq!(report.description, "unknown");
        assert_eq!(report.temperature, 0.0);
        assert_eq!(report.units, WeatherUnits::Metric);
    }

    #[tokio::test]
    async fn unauthorized_is_authentication_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "cod": 401,
                "message": "Invalid API key."
            })))
            .mount(&server)
            .await;

        let error = tool_for(&server)
            .lookup("Lima, Peru", WeatherUnits::Imperial)
            .await
            .unwrap_err();

        assert!(matches!(error, ToolError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn not_found_carries_upstream_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "cod": "404",
                "message": "city not found"
            })))
            .mount(&server)
            .await;

        let error = tool_for(&server)
            .lookup("Atlantis", WeatherUnits::Imperial)
            .await
            .unwrap_err();

        assert_eq!(error, ToolError::ResourceNotFound("city not found".to_string()));
    }

    #[tokio::test]
    async fn other_status_is_lookup_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let error = tool_for(&server)
            .lookup("Lima, Peru", WeatherUnits::Imperial)
            .await
            .unwrap_err();

        assert!(matches!(error, ToolError::Execution(message) if message.contains("500")));
    }

    #[tokio::test]
    async fn transport_failure_is_lookup_failure() {
        // Nothing listens on this port once the server is dropped
        let uri = {
            let server = MockServer::start().await;
            server.uri()
        };

        let error = WeatherTool::new("k")
            .with_base_url(uri)
            .lookup("Lima, Peru", WeatherUnits::Imperial)
            .await
            .unwrap_err();

        assert!(matches!(error, ToolError::Execution(_)));
    }

    #[tokio::test]
    async fn execute_applies_default_location_and_units() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "Lima, Peru"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(syracuse_body()))
            .expect(1)
            .mount(&server)
            .await;

        let tool = tool_for(&server)
            .with_default_location("Lima, Peru")
            .with_default_units(WeatherUnits::Metric);

        let payload = tool.execute(json!({ "location": "  " })).await.expect("payload");

        assert_eq!(payload["location"], "Lima, Peru");
        assert_eq!(payload["units"], "metric");
        assert_eq!(payload["temperature"], 45.0);
    }

    #[test]
    fn resolve_args_falls_back_on_bad_units() {
        let tool = WeatherTool::new("k");

        let (location, units) = tool.resolve_args(&json!({ "location": "Lima, Peru", "units": "kelvin" }));
        assert_eq!(location, "Lima, Peru");
        assert_eq!(units, WeatherUnits::Imperial);

        let (location, units) = tool.resolve_args(&json!({ "units": "METRIC" }));
        assert_eq!(location, DEFAULT_LOCATION);
        assert_eq!(units, WeatherUnits::Metric);
    }

    #[test]
    fn blank_default_location_is_ignored() {
        let tool = WeatherTool::new("k").with_default_location("   ");
        assert_eq!(tool.default_location(), DEFAULT_LOCATION);
    }

    #[test]
    fn schema_requires_location() {
        let schema = WeatherTool::new("k").to_schema();

        assert_eq!(schema.function.name, WEATHER_TOOL_NAME);
        assert_eq!(schema.function.parameters["required"], json!(["location"]));
        assert_eq!(
            schema.function.parameters["properties"]["units"]["enum"],
            json!(["imperial", "metric"])
        );
    }
}
