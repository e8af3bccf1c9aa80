//! Weather side of UmbrellaAlert.
//!
//! Fetches current conditions and forecasts from OpenWeatherMap and decides,
//! per location, whether today calls for an umbrella or sunscreen and whether
//! it is currently 8:00 AM there.

pub mod analysis;
pub mod forecast;
pub mod location;
pub mod provider;
pub mod timezone;
pub mod trigger;
pub mod types;

pub use analysis::{analyze, should_notify, AlertAnalysis};
pub use forecast::{daily_high, DailyHigh, FALLBACK_DAILY_HIGH_F};
pub use location::{resolve_location, LocationQuery};
pub use provider::{OpenWeatherProvider, WeatherProvider};
pub use timezone::resolve_timezone;
pub use trigger::{is_local_eight_am, local_now, next_local_eight_am};
pub use types::*;
