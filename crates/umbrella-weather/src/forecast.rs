use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::types::ForecastSeries;

/// Reading used when no forecast sample falls on the requested day.
pub const FALLBACK_DAILY_HIGH_F: f64 = 75.0;

/// Highest forecast temperature for a local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DailyHigh {
    /// Maximum of the samples that fall on the day
    Forecast(f64),
    /// No sample fell on the day; reads as [`FALLBACK_DAILY_HIGH_F`]
    Fallback,
}

impl DailyHigh {
    pub fn fahrenheit(self) -> f64 {
        match self {
            Self::Forecast(t) => t,
            Self::Fallback => FALLBACK_DAILY_HIGH_F,
        }
    }

    pub fn is_fallback(self) -> bool {
        matches!(self, Self::Fallback)
    }
}

/// Daily high for `today` as seen from `tz`.
///
/// Samples are bucketed by their civil date in the location's timezone, so a
/// 03:00 UTC sample counts toward the previous evening in the Americas.
pub fn daily_high(forecast: &ForecastSeries, today: NaiveDate, tz: Tz) -> DailyHigh {
    forecast
        .points
        .iter()
        .filter(|p| p.timestamp_utc.with_timezone(&tz).date_naive() == today)
        .map(|p| p.temperature_f)
        .filter(|t| t.is_finite())
        .fold(None, |high: Option<f64>, t| Some(high.map_or(t, |h| h.max(t))))
        .map_or(DailyHigh::Fallback, DailyHigh::Forecast)
}
