use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    /// Strategy to use: "baseline", "weekday" or "auto" (history-span routing).
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of the remote seasonal predictor, if any.
    #[serde(default)]
    pub predictor_url: Option<String>,
    /// Timezone hint forwarded to the remote predictor in hourly mode.
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory the local SQLite store lives under.
    #[serde(default = "default_data_root")]
    pub data_root: String,
}

fn default_model() -> String {
    "baseline".to_string()
}

fn default_data_root() -> String {
    "data".to_string()
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            predictor_url: None,
            timezone: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
        }
    }
}

impl Config {
    /// Loads `config.toml` from the working directory, falling back to
    /// defaults when it does not exist. `DEMANDCAST_*` environment
    /// variables override file values.
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        let mut config = match fs::read_to_string(config_path) {
            Ok(content) => toml::from_str::<Config>(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => {
                return Err(PipelineError::Config(format!(
                    "Failed to read config file '{}': {}",
                    config_path, e
                )))
            }
        };

        if let Ok(url) = std::env::var("DEMANDCAST_PREDICTOR_URL") {
            if !url.is_empty() {
                config.forecast.predictor_url = Some(url);
            }
        }
        if let Ok(model) = std::env::var("DEMANDCAST_MODEL") {
            if !model.is_empty() {
                config.forecast.model = model;
            }
        }
        if let Ok(root) = std::env::var("DEMANDCAST_DATA_ROOT") {
            if !root.is_empty() {
                config.storage.data_root = root;
            }
        }

        Ok(config)
    }
}
