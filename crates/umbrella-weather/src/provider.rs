//! OpenWeatherMap client.
//!
//! Current conditions come from `/weather`, the 5-day / 3-hour series from
//! `/forecast`. Both are requested in imperial units.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use umbrella_core::{ReqwestErrorExt, WeatherConfig};

use crate::location::LocationQuery;
use crate::types::{ForecastPoint, ForecastSeries, WeatherError, WeatherSnapshot};

const USER_AGENT: &str = "UmbrellaAlert/0.1.0";

/// Source of current conditions and forecasts.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// # Errors
    /// `LocationNotFound`, `Transient`, `InvalidApiKey` or `MalformedWeatherData`.
    async fn fetch_current(&self, query: &LocationQuery) -> Result<WeatherSnapshot, WeatherError>;

    /// # Errors
    /// Same taxonomy as [`WeatherProvider::fetch_current`].
    async fn fetch_forecast(&self, query: &LocationQuery) -> Result<ForecastSeries, WeatherError>;
}

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct OwmCurrentResponse {
    name: Option<String>,
    main: Option<OwmMain>,
    #[serde(default)]
    weather: Vec<OwmWeather>,
    timezone: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmWeather {
    main: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwmForecastResponse {
    #[serde(default)]
    list: Vec<OwmForecastItem>,
}

#[derive(Debug, Deserialize)]
struct OwmForecastItem {
    dt: i64,
    main: OwmMain,
}

impl From<OwmCurrentResponse> for WeatherSnapshot {
    fn from(resp: OwmCurrentResponse) -> Self {
        let first = resp.weather.into_iter().next();
        let (condition_main, condition_description) = match first {
            Some(w) => (w.main, w.description),
            None => (None, None),
        };

        Self {
            location_name: resp.name,
            current_temperature_f: resp.main.and_then(|m| m.temp),
            condition_main,
            condition_description,
            utc_offset_seconds: resp.timezone,
        }
    }
}

impl TryFrom<OwmForecastResponse> for ForecastSeries {
    type Error = WeatherError;

    fn try_from(resp: OwmForecastResponse) -> Result<Self, Self::Error> {
        let points = resp
            .list
            .into_iter()
            .map(|item| {
                let timestamp_utc = DateTime::<Utc>::from_timestamp(item.dt, 0).ok_or_else(|| {
                    WeatherError::malformed(format!("forecast timestamp out of range: {}", item.dt))
                })?;
                let temperature_f = item.main.temp.ok_or_else(|| {
                    WeatherError::malformed(format!("forecast entry {} has no temperature", item.dt))
                })?;
                Ok(ForecastPoint {
                    timestamp_utc,
                    temperature_f,
                })
            })
            .collect::<Result<Vec<_>, WeatherError>>()?;

        Ok(ForecastSeries::new(points))
    }
}

impl OpenWeatherProvider {
    /// Build a provider from configuration.
    ///
    /// # Errors
    /// `Config` when no API key is set; `Transient` if the HTTP client cannot be built.
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let api_key = config.require_api_key()?.to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| e.into_network_error())?;

        Ok(Self {
            client: Arc::new(client),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &LocationQuery,
    ) -> Result<T, WeatherError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let q = query.provider_query();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", q.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "imperial"),
            ])
            .send()
            .await
            .map_err(|e| e.into_network_error())?;

        self.handle_response(response, query).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
        query: &LocationQuery,
    ) -> Result<T, WeatherError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| WeatherError::malformed(format!("JSON parse error: {}", e)))
        } else if status == StatusCode::NOT_FOUND {
            Err(WeatherError::LocationNotFound(query.label()))
        } else if status == StatusCode::UNAUTHORIZED {
            Err(WeatherError::InvalidApiKey)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(WeatherError::Transient(umbrella_core::NetworkError::ServerError {
                status: status.as_u16(),
                message,
            }))
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    #[instrument(skip(self), fields(q = %query.provider_query()), level = "debug")]
    async fn fetch_current(&self, query: &LocationQuery) -> Result<WeatherSnapshot, WeatherError> {
        let resp: OwmCurrentResponse = self.get("weather", query).await?;
        Ok(WeatherSnapshot::from(resp))
    }

    #[instrument(skip(self), fields(q = %query.provider_query()), level = "debug")]
    async fn fetch_forecast(&self, query: &LocationQuery) -> Result<ForecastSeries, WeatherError> {
        let resp: OwmForecastResponse = self.get("forecast", query).await?;
        let series = ForecastSeries::try_from(resp)?;
        tracing::debug!("Forecast has {} samples", series.points.len());
        Ok(series)
    }
}
