use serde::{Deserialize, Serialize};

use crate::provider::WeatherProvider;
use crate::types::{WeatherError, WeatherSnapshot};

pub const DEFAULT_COUNTRY_CODE: &str = "US";

/// A subscriber's location as typed on the subscription form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationQuery {
    pub city: String,
    pub zipcode: Option<String>,
    pub country_code: String,
}

impl LocationQuery {
    /// Trim inputs, drop an empty zipcode and default the country to US.
    pub fn new(city: &str, zipcode: Option<&str>, country_code: Option<&str>) -> Self {
        let zipcode = zipcode
            .map(str::trim)
            .filter(|z| !z.is_empty())
            .map(str::to_string);
        let country_code = country_code
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_COUNTRY_CODE)
            .to_uppercase();

        Self {
            city: city.trim().to_string(),
            zipcode,
            country_code,
        }
    }

    /// City plus zipcode when one was given, e.g. "Nashville, 37203".
    pub fn place(&self) -> String {
        match &self.zipcode {
            Some(zip) => format!("{}, {}", self.city, zip),
            None => self.city.clone(),
        }
    }

    /// The `q` parameter OpenWeatherMap expects: "city[, zip],CC".
    pub fn provider_query(&self) -> String {
        format!("{},{}", self.place(), self.country_code)
    }

    /// Human-readable label used in emails and logs.
    pub fn label(&self) -> String {
        format!("{}, {}", self.place(), self.country_code)
    }
}

impl std::fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Check that the provider recognizes `query` and return its current conditions.
///
/// # Errors
/// `LocationNotFound` when the provider has no match or returns a payload
/// without a timezone (it cannot be scheduled); provider errors otherwise.
pub async fn resolve_location(
    provider: &dyn WeatherProvider,
    query: &LocationQuery,
) -> Result<WeatherSnapshot, WeatherError> {
    if query.city.is_empty() {
        return Err(WeatherError::LocationNotFound(query.label()));
    }

    let snapshot = provider.fetch_current(query).await?;
    if snapshot.utc_offset_seconds.is_none() {
        tracing::warn!("Provider returned no timezone for {}", query);
        return Err(WeatherError::LocationNotFound(query.label()));
    }

    tracing::info!(
        "Resolved {} to {}",
        query,
        snapshot.location_name.as_deref().unwrap_or("unnamed location")
    );
    Ok(snapshot)
}
