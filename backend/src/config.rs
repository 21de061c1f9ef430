//! Configuration management for CropWatch
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with CROPWATCH__ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::TemperatureUnit;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Uploaded media storage
    pub storage: StorageConfig,

    /// Weather and geocoding API configuration
    pub weather: WeatherConfig,

    /// Disease classifier configuration
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory uploaded images are written to
    pub media_root: PathBuf,

    /// Largest accepted upload body in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    /// Open-Meteo forecast endpoint
    pub forecast_endpoint: String,

    /// Open-Meteo geocoding endpoint (primary place-name lookup)
    pub geocoding_endpoint: String,

    /// Nominatim reverse geocoding endpoint (fallback place-name lookup)
    pub nominatim_endpoint: String,

    /// User-Agent sent to Nominatim, which rejects anonymous clients
    pub user_agent: String,

    /// Timeout applied to every outbound weather/geocoding request
    pub timeout_secs: u64,

    /// Units used for forecasts attached to uploads
    pub default_units: TemperatureUnit,
}

/// Which classifier implementation to run
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierBackend {
    /// Hosted inference endpoint
    Remote,
    /// Locally fetched model artifact
    Local,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    pub backend: ClassifierBackend,

    /// Hosted image-classification endpoint (remote backend)
    pub inference_endpoint: Option<String>,

    /// Bearer token for the hub and the inference endpoint
    pub api_token: Option<String>,

    /// Model hub base URL
    pub hub_endpoint: String,

    /// Repository holding the model artifact
    pub model_repo: String,

    /// Artifact file name inside the repository
    pub model_filename: String,

    /// Directory the artifact is cached in
    pub model_dir: PathBuf,

    /// Persistent disk preferred over `model_dir` when present and writable
    pub persistent_dir: Option<PathBuf>,

    /// Timeout for inference and artifact download requests
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("CROPWATCH_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 8000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 86400)?
            .set_default("storage.media_root", "media")?
            .set_default("storage.max_upload_bytes", 10 * 1024 * 1024)?
            .set_default("weather.forecast_endpoint", "https://api.open-meteo.com/v1/forecast")?
            .set_default(
                "weather.geocoding_endpoint",
                "https://geocoding-api.open-meteo.com/v1/search",
            )?
            .set_default(
                "weather.nominatim_endpoint",
                "https://nominatim.openstreetmap.org/reverse",
            )?
            .set_default("weather.user_agent", "CropWatch Weather Forecast/1.0")?
            .set_default("weather.timeout_secs", 10)?
            .set_default("weather.default_units", "fahrenheit")?
            .set_default("classifier.backend", "local")?
            .set_default("classifier.hub_endpoint", "https://huggingface.co")?
            .set_default("classifier.model_repo", "dostah01/shark")?
            .set_default("classifier.model_filename", "corn_model_1.keras")?
            .set_default("classifier.model_dir", "models")?
            .set_default("classifier.timeout_secs", 60)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (CROPWATCH__ prefix)
            .add_source(
                Environment::with_prefix("CROPWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "0.0.0.0".to_string(),
        }
    }
}
