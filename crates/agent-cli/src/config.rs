use std::path::{Path, PathBuf};
use std::time::Duration;

use agent_tools::{WeatherUnits, DEFAULT_LOCATION};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const ADVANCED_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_TOKEN_BUDGET: u32 = 800;

const CONFIG_FILE_PATH: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid TOML config {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },

    #[error("{0} is not set (config file or environment)")]
    MissingKey(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub openai_api_key: Option<String>,
    pub openweather_api_key: Option<String>,
    pub api_base: Option<String>,
    pub model: String,
    pub advanced_model: String,
    pub token_budget: u32,
    pub temperature: f32,
    pub default_location: String,
    pub units: WeatherUnits,
    pub request_timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openweather_api_key: None,
            api_base: None,
            model: DEFAULT_MODEL.to_string(),
            advanced_model: ADVANCED_MODEL.to_string(),
            token_budget: DEFAULT_TOKEN_BUDGET,
            temperature: 0.0,
            default_location: DEFAULT_LOCATION.to_string(),
            units: WeatherUnits::Imperial,
            request_timeout_secs: Some(60),
        }
    }
}

fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".weather-chat")
}

pub fn config_json_path() -> PathBuf {
    app_dir().join("config.json")
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl AppConfig {
    /// `~/.weather-chat/config.json`, else `./config.toml`, then environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(
            &config_json_path(),
            Path::new(CONFIG_FILE_PATH),
            |name| std::env::var(name).ok(),
        )
    }

    /// The JSON file wins over the TOML file; environment variables found
    /// through `env` override either.
    pub fn load_from<F>(json_path: &Path, toml_path: &Path, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if json_path.exists() {
            log::debug!("Loading config from {}", json_path.display());
            let content = read(json_path)?;
            serde_json::from_str::<AppConfig>(&content).map_err(|source| ConfigError::Json {
                path: json_path.to_path_buf(),
                source,
            })?
        } else if toml_path.exists() {
            log::debug!("Loading config from {}", toml_path.display());
            let content = read(toml_path)?;
            toml::from_str::<AppConfig>(&content).map_err(|source| ConfigError::Toml {
                path: toml_path.to_path_buf(),
                source,
            })?
        } else {
            AppConfig::default()
        };

        if let Some(key) = env("OPENAI_API_KEY").and_then(non_blank) {
            config.openai_api_key = Some(key);
        }
        if let Some(key) = env("OPENWEATHER_API_KEY").and_then(non_blank) {
            config.openweather_api_key = Some(key);
        }
        if let Some(api_base) = env("API_BASE").and_then(non_blank) {
            config.api_base = Some(api_base);
        }
        if let Some(model) = env("MODEL").and_then(non_blank) {
            config.model = model;
        }
        if let Some(budget) = env("TOKEN_BUDGET").and_then(non_blank) {
            config.token_budget = budget.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "TOKEN_BUDGET",
                value: budget.clone(),
            })?;
        }
        if let Some(location) = env("DEFAULT_LOCATION").and_then(non_blank) {
            config.default_location = location;
        }

        Ok(config)
    }

    /// An explicit model (`--model`) wins, then `advanced_model` when
    /// `advanced` is set, then `model`.
    pub fn active_model<'a>(&'a self, explicit: Option<&'a str>, advanced: bool) -> &'a str {
        match explicit.map(str::trim).filter(|model| !model.is_empty()) {
            Some(model) => model,
            None if advanced => &self.advanced_model,
            None => &self.model,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn require_openai_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .ok_or(ConfigError::MissingKey("OPENAI_API_KEY"))
    }

    pub fn require_openweather_key(&self) -> Result<&str, ConfigError> {
        self.openweather_api_key
            .as_deref()
            .ok_or(ConfigError::MissingKey("OPENWEATHER_API_KEY"))
    }
}
