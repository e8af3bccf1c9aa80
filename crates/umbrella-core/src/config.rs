use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

const APP_DIR_NAME: &str = "umbrella-alert";

pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_HEAT_THRESHOLD_F: f64 = 80.0;
pub const DEFAULT_RAIN_KEYWORDS: [&str; 6] =
    ["rain", "drizzle", "thunderstorm", "snow", "sleet", "shower rain"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Weather provider settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Outgoing mail settings
    #[serde(default)]
    pub email: EmailConfig,

    /// Alert thresholds and keywords
    #[serde(default)]
    pub alerts: AlertConfig,

    /// Background evaluator settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Subscriber database settings
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key (usually supplied via WEATHER_API_KEY)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the 2.5 API; `/weather` and `/forecast` are appended
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_weather_base_url() -> String {
    DEFAULT_WEATHER_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl WeatherConfig {
    /// The API key, or `MissingSetting` when absent or blank.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingSetting("WEATHER_API_KEY".to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host
    #[serde(default = "default_smtp_server")]
    pub smtp_server: String,

    /// SMTP port (STARTTLS)
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// Sender address, also the SMTP username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// SMTP password (app password for Gmail)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Send timeout in seconds
    #[serde(default = "default_smtp_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_smtp_server() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_timeout_secs() -> u64 {
    30
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_server: default_smtp_server(),
            smtp_port: default_smtp_port(),
            address: None,
            password: None,
            timeout_secs: default_smtp_timeout_secs(),
        }
    }
}

impl EmailConfig {
    /// Check if sender credentials are present
    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    /// Sender address and password, or `MissingSetting` naming the first gap.
    pub fn credentials(&self) -> Result<(&str, &str), ConfigError> {
        let address = self
            .address
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingSetting("EMAIL_ADDRESS".to_string()))?;
        let password = self
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ConfigError::MissingSetting("EMAIL_PASSWORD".to_string()))?;
        Ok((address, password))
    }
}

/// Thresholds the alert engine evaluates against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertConfig {
    /// Daily high above which a sunscreen reminder is sent (°F, exclusive)
    #[serde(default = "default_heat_threshold_f")]
    pub heat_threshold_f: f64,

    /// Case-insensitive substrings of the condition description that mean rain
    #[serde(default = "default_rain_keywords")]
    pub rain_keywords: Vec<String>,
}

fn default_heat_threshold_f() -> f64 {
    DEFAULT_HEAT_THRESHOLD_F
}

fn default_rain_keywords() -> Vec<String> {
    DEFAULT_RAIN_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            heat_threshold_f: default_heat_threshold_f(),
            rain_keywords: default_rain_keywords(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between evaluator ticks
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
}

fn default_tick_seconds() -> u64 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file holding subscribers
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_config_dir().join("subscribers.db"),
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            weather: WeatherConfig::default(),
            email: EmailConfig::default(),
            alerts: AlertConfig::default(),
            scheduler: SchedulerConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist.
    ///
    /// A `.env` file in the working directory is read first; secrets and the
    /// database path can then be overridden from the environment.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }

        let config_path = Self::config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from an explicit path, writing defaults when missing.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Overlay secrets and paths from the environment.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("WEATHER_API_KEY") {
            self.weather.api_key = Some(key);
        }
        if let Some(address) = lookup("EMAIL_ADDRESS") {
            self.email.address = Some(address);
        }
        if let Some(password) = lookup("EMAIL_PASSWORD") {
            self.email.password = Some(password);
        }
        if let Some(server) = lookup("SMTP_SERVER") {
            self.email.smtp_server = server;
        }
        if let Some(port) = lookup("SMTP_PORT") {
            match port.parse() {
                Ok(p) => self.email.smtp_port = p,
                Err(_) => tracing::warn!("Ignoring non-numeric SMTP_PORT: {}", port),
            }
        }
        if let Some(path) = lookup("UMBRELLA_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        }

        if self.weather.require_api_key().is_err() {
            result.add_warning(
                "weather.api_key",
                "WEATHER_API_KEY not set - background notifications are disabled",
            );
        }

        if !self.email.is_configured() {
            result.add_warning(
                "email",
                "EMAIL_ADDRESS/EMAIL_PASSWORD not set - emails will not be sent",
            );
        }

        if self.scheduler.tick_seconds == 0 {
            result.add_error("scheduler.tick_seconds", "Tick interval must be greater than 0");
        } else if self.scheduler.tick_seconds > 60 {
            result.add_warning(
                "scheduler.tick_seconds",
                "Ticks longer than 60 seconds can skip the 8:00 AM minute",
            );
        }

        if !self.alerts.heat_threshold_f.is_finite() {
            result.add_error("alerts.heat_threshold_f", "Threshold must be a finite number");
        }

        if self.alerts.rain_keywords.iter().any(|k| k.trim().is_empty()) {
            result.add_error("alerts.rain_keywords", "Keywords must not be blank");
        } else if self.alerts.rain_keywords.is_empty() {
            result.add_warning("alerts.rain_keywords", "No rain keywords - umbrella alerts disabled");
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to file
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_DIR_NAME);

        Ok(config_dir.join("config.toml"))
    }
}
