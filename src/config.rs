//! Configuration management for the AQI dashboard
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::AqiError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// AirNow API configuration
    #[serde(default)]
    pub airnow: AirNowConfig,
    /// Memoization configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// City catalog configuration
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Presenter settings
    #[serde(default)]
    pub dashboard: DashboardSettings,
}

/// AirNow API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirNowConfig {
    /// AirNow API key. Can also be entered on the dashboard.
    pub api_key: Option<String>,
    /// Base URL for the observation API
    #[serde(default = "default_airnow_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_airnow_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient failures
    #[serde(default = "default_airnow_max_retries")]
    pub max_retries: u32,
    /// Search radius around the requested location, in miles
    #[serde(default = "default_airnow_distance")]
    pub distance_miles: u32,
}

/// Memoization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a memoized current reading, in minutes
    #[serde(default = "default_cache_ttl")]
    pub ttl_minutes: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// CSV file with City, Zipcode, Latitude, Longitude columns
    #[serde(default = "default_catalog_path")]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSettings {
    /// Upper bound on in-flight city lookups while rendering the map
    #[serde(default = "default_max_concurrent_lookups")]
    pub max_concurrent_lookups: u32,
    /// Days shown in the historical trend chart
    #[serde(default = "default_trend_days")]
    pub trend_days: u32,
}

// Default value functions
fn default_airnow_base_url() -> String {
    "https://www.airnowapi.org/aq/observation".to_string()
}

fn default_airnow_timeout() -> u32 {
    10
}

fn default_airnow_max_retries() -> u32 {
    2
}

fn default_airnow_distance() -> u32 {
    25
}

fn default_cache_ttl() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8501
}

fn default_catalog_path() -> String {
    "data/california_zip_codes.csv".to_string()
}

fn default_max_concurrent_lookups() -> u32 {
    4
}

fn default_trend_days() -> u32 {
    7
}

impl Default for AirNowConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_airnow_base_url(),
            timeout_seconds: default_airnow_timeout(),
            max_retries: default_airnow_max_retries(),
            distance_miles: default_airnow_distance(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_cache_ttl(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            max_concurrent_lookups: default_max_concurrent_lookups(),
            trend_days: default_trend_days(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            airnow: AirNowConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
            catalog: CatalogConfig::default(),
            dashboard: DashboardSettings::default(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        let path = std::env::var_os("AQI_DASHBOARD_CONFIG").map(PathBuf::from);
        Self::load_from_path(path)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path()
                .filter(|p| p.exists())
                .unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // AQI_DASHBOARD__AIRNOW__API_KEY -> airnow.api_key
        builder = builder.add_source(
            Environment::with_prefix("AQI_DASHBOARD")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: DashboardConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        // Plain AIRNOW_API_KEY is honored too, e.g. from a .env file.
        if config.airnow.api_key.is_none() {
            config.airnow.api_key = std::env::var("AIRNOW_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty());
        }

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("aqi-dashboard").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.airnow.base_url.is_empty() {
            self.airnow.base_url = default_airnow_base_url();
        }
        if self.airnow.timeout_seconds == 0 {
            self.airnow.timeout_seconds = default_airnow_timeout();
        }
        if self.airnow.distance_miles == 0 {
            self.airnow.distance_miles = default_airnow_distance();
        }
        if self.cache.ttl_minutes == 0 {
            self.cache.ttl_minutes = default_cache_ttl();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.server.host.is_empty() {
            self.server.host = default_server_host();
        }
        if self.catalog.path.is_empty() {
            self.catalog.path = default_catalog_path();
        }
        if self.dashboard.max_concurrent_lookups == 0 {
            self.dashboard.max_concurrent_lookups = default_max_concurrent_lookups();
        }
        if self.dashboard.trend_days == 0 {
            self.dashboard.trend_days = default_trend_days();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.airnow.timeout_seconds > 120 {
            return Err(AqiError::config("AirNow API timeout cannot exceed 120 seconds").into());
        }

        if self.airnow.max_retries > 10 {
            return Err(AqiError::config("AirNow API max retries cannot exceed 10").into());
        }

        if self.airnow.distance_miles > 500 {
            return Err(AqiError::config("AirNow search distance cannot exceed 500 miles").into());
        }

        if self.cache.ttl_minutes > 24 * 60 {
            return Err(AqiError::config("Cache TTL cannot exceed 1440 minutes (1 day)").into());
        }

        if self.dashboard.max_concurrent_lookups > 32 {
            return Err(AqiError::config("Concurrent lookups cannot exceed 32").into());
        }

        if self.dashboard.trend_days > 30 {
            return Err(AqiError::config("Trend cannot span more than 30 days").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(AqiError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(AqiError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.airnow.base_url.starts_with("http://")
            && !self.airnow.base_url.starts_with("https://")
        {
            return Err(
                AqiError::config("AirNow base URL must be a valid HTTP or HTTPS URL").into(),
            );
        }

        Ok(())
    }
}
