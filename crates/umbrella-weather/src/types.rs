use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use umbrella_core::{ConfigError, NetworkError};

/// Current conditions for one location, as reported by a single provider query.
///
/// Fields mirror what the provider may omit; the analysis step rejects a
/// snapshot missing what it needs rather than guessing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location_name: Option<String>,
    pub current_temperature_f: Option<f64>,
    pub condition_main: Option<String>,
    pub condition_description: Option<String>,
    pub utc_offset_seconds: Option<i32>,
}

impl WeatherSnapshot {
    pub fn temperature_f(&self) -> Result<f64, WeatherError> {
        self.current_temperature_f
            .filter(|t| t.is_finite())
            .ok_or_else(|| WeatherError::malformed("missing current temperature"))
    }

    pub fn description(&self) -> Result<&str, WeatherError> {
        self.condition_description
            .as_deref()
            .ok_or_else(|| WeatherError::malformed("missing condition description"))
    }

    pub fn utc_offset(&self) -> Result<i32, WeatherError> {
        self.utc_offset_seconds
            .ok_or_else(|| WeatherError::malformed("missing timezone offset"))
    }
}

/// One forecast sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp_utc: DateTime<Utc>,
    pub temperature_f: f64,
}

/// Forecast samples (5 days in 3-hour steps from OpenWeatherMap)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub points: Vec<ForecastPoint>,
}

impl ForecastSeries {
    pub fn new(points: Vec<ForecastPoint>) -> Self {
        Self { points }
    }
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Invalid weather API key")]
    InvalidApiKey,

    #[error("Weather provider unavailable: {0}")]
    Transient(#[from] NetworkError),

    #[error("Malformed weather data: {0}")]
    MalformedWeatherData(String),

    #[error("Weather provider not configured: {0}")]
    Config(#[from] ConfigError),
}

impl WeatherError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedWeatherData(message.into())
    }

    /// Whether the same request may succeed on a later tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::LocationNotFound(_) => {
                "Could not find weather data for that location. Check the city name and zipcode."
            }
            Self::InvalidApiKey => "The weather API key was rejected. Check WEATHER_API_KEY.",
            Self::Transient(e) => e.user_message(),
            Self::MalformedWeatherData(_) => "The weather service sent data we could not read.",
            Self::Config(e) => e.user_message(),
        }
    }
}
