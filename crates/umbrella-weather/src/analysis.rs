//! Alert decision engine.
//!
//! Combines current conditions with the forecast daily high and produces the
//! reminders worth emailing. Pure: no I/O, no clock.

use serde::{Deserialize, Serialize};
use umbrella_core::AlertConfig;

use crate::forecast::DailyHigh;
use crate::types::{WeatherError, WeatherSnapshot};

pub const UMBRELLA_ALERT: &str = "🌧️ Bring an umbrella! Rain is expected.";
pub const SUNSCREEN_ALERT: &str = "☀️ High temperature expected. Don't forget sunscreen!";
pub const UMBRELLA_AND_SUNSCREEN_ALERT: &str =
    "☀️🌧️ High temperature and rain expected. Bring umbrella AND sunscreen!";

/// Everything the notifier needs to tell one subscriber about today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertAnalysis {
    pub location_label: String,
    pub current_temperature_f: f64,
    pub daily_high_f: f64,
    /// The daily high is the stand-in value, not a forecast reading
    pub daily_high_is_fallback: bool,
    pub condition_main: String,
    pub condition_description: String,
    /// Rain-derived reminder first, then heat. Empty means nothing to send.
    pub alerts: Vec<String>,
}

/// Case-insensitive keyword match against the condition description.
pub fn is_rainy(description: &str, rules: &AlertConfig) -> bool {
    let description = description.to_lowercase();
    rules
        .rain_keywords
        .iter()
        .any(|keyword| description.contains(&keyword.to_lowercase()))
}

pub fn is_hot(daily_high_f: f64, rules: &AlertConfig) -> bool {
    daily_high_f > rules.heat_threshold_f
}

/// Decide which reminders apply today.
///
/// Heat is judged on the daily high only; the current reading is reported but
/// does not trigger anything.
///
/// # Errors
/// `MalformedWeatherData` when the snapshot lacks a temperature or description.
pub fn analyze(
    snapshot: &WeatherSnapshot,
    daily_high: DailyHigh,
    location_label: &str,
    rules: &AlertConfig,
) -> Result<AlertAnalysis, WeatherError> {
    let current_temperature_f = snapshot.temperature_f()?;
    let condition_description = snapshot.description()?.to_lowercase();
    let condition_main = snapshot
        .condition_main
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();

    let daily_high_f = daily_high.fahrenheit();
    let rainy = is_rainy(&condition_description, rules);
    let hot = is_hot(daily_high_f, rules);

    let alerts = match (rainy, hot) {
        (true, true) => vec![UMBRELLA_AND_SUNSCREEN_ALERT.to_string()],
        (true, false) => vec![UMBRELLA_ALERT.to_string()],
        (false, true) => vec![SUNSCREEN_ALERT.to_string()],
        (false, false) => Vec::new(),
    };

    Ok(AlertAnalysis {
        location_label: location_label.to_string(),
        current_temperature_f,
        daily_high_f,
        daily_high_is_fallback: daily_high.is_fallback(),
        condition_main,
        condition_description,
        alerts,
    })
}

pub fn should_notify(analysis: &AlertAnalysis) -> bool {
    !analysis.alerts.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(temp: f64, description: &str) -> WeatherSnapshot {
        WeatherSnapshot {
            location_name: Some("Nashville".into()),
            current_temperature_f: Some(temp),
            condition_main: Some("Clouds".into()),
            condition_description: Some(description.into()),
            utc_offset_seconds: Some(-18000),
        }
    }

    fn run(description: &str, high: f64) -> AlertAnalysis {
        analyze(
            &snapshot(70.0, description),
            DailyHigh::Forecast(high),
            "Nashville, US",
            &AlertConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_rain_and_heat_combined() {
        assert_eq!(run("moderate rain", 85.0).alerts, vec![UMBRELLA_AND_SUNSCREEN_ALERT]);
    }

    #[test]
    fn test_rain_only() {
        assert_eq!(run("moderate rain", 70.0).alerts, vec![UMBRELLA_ALERT]);
    }

    #[test]
    fn test_heat_only() {
        assert_eq!(run("clear sky", 85.0).alerts, vec![SUNSCREEN_ALERT]);
    }

    #[test]
    fn test_neither() {
        let analysis = run("clear sky", 70.0);
        assert!(analysis.alerts.is_empty());
        assert!(!should_notify(&analysis));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert!(run("clear sky", 80.0).alerts.is_empty());
        assert_eq!(run("clear sky", 80.1).alerts, vec![SUNSCREEN_ALERT]);
    }

    #[test]
    fn test_keywords() {
        for description in [
            "light rain",
            "drizzle",
            "thunderstorm with heavy rain",
            "light snow",
            "sleet",
            "shower rain",
            "Heavy Intensity RAIN",
        ] {
            assert_eq!(run(description, 60.0).alerts, vec![UMBRELLA_ALERT], "{}", description);
        }
        for description in ["clear sky", "few clouds", "mist", "haze"] {
            assert!(run(description, 60.0).alerts.is_empty(), "{}", description);
        }
    }

    #[test]
    fn test_custom_keywords_and_threshold() {
        let rules = AlertConfig {
            heat_threshold_f: 90.0,
            rain_keywords: vec!["Mist".to_string()],
        };
        let analysis =
            analyze(&snapshot(70.0, "mist"), DailyHigh::Forecast(85.0), "Here", &rules).unwrap();
        assert_eq!(analysis.alerts, vec![UMBRELLA_ALERT]);

        let analysis =
            analyze(&snapshot(70.0, "light rain"), DailyHigh::Forecast(95.0), "Here", &rules)
                .unwrap();
        assert_eq!(analysis.alerts, vec![SUNSCREEN_ALERT]);
    }

    #[test]
    fn test_current_temperature_does_not_trigger_heat() {
        let analysis = analyze(
            &snapshot(99.0, "clear sky"),
            DailyHigh::Forecast(70.0),
            "Phoenix, US",
            &AlertConfig::default(),
        )
        .unwrap();
        assert!(analysis.alerts.is_empty());
        assert_eq!(analysis.current_temperature_f, 99.0);
        assert_eq!(analysis.daily_high_f, 70.0);
    }

    #[test]
    fn test_fallback_high_is_flagged() {
        let analysis = analyze(
            &snapshot(60.0, "clear sky"),
            DailyHigh::Fallback,
            "Somewhere, US",
            &AlertConfig::default(),
        )
        .unwrap();
        assert_eq!(analysis.daily_high_f, 75.0);
        assert!(analysis.daily_high_is_fallback);
        assert!(analysis.alerts.is_empty());
    }

    #[test]
    fn test_light_rain_scenario() {
        let analysis = analyze(
            &snapshot(72.0, "light rain"),
            DailyHigh::Forecast(72.0),
            "Nashville, US",
            &AlertConfig::default(),
        )
        .unwrap();
        assert_eq!(analysis.alerts, vec!["🌧️ Bring an umbrella! Rain is expected."]);
        assert!(should_notify(&analysis));
        assert_eq!(analysis.location_label, "Nashville, US");
        assert_eq!(analysis.condition_main, "clouds");
    }

    #[test]
    fn test_clear_and_hot_scenario() {
        let analysis = analyze(
            &snapshot(90.0, "clear sky"),
            DailyHigh::Forecast(90.0),
            "Phoenix, US",
            &AlertConfig::default(),
        )
        .unwrap();
        assert_eq!(
            analysis.alerts,
            vec!["☀️ High temperature expected. Don't forget sunscreen!"]
        );
    }

    #[test]
    fn test_should_notify_matches_alerts() {
        let descriptions = ["light rain", "clear sky", "snow", "overcast clouds"];
        let highs = [40.0, 75.0, 80.0, 81.0, 105.0];
        for description in descriptions {
            for high in highs {
                let analysis = run(description, high);
                assert_eq!(should_notify(&analysis), !analysis.alerts.is_empty());
            }
        }
    }

    #[test]
    fn test_missing_temperature_is_malformed() {
        let mut s = snapshot(70.0, "rain");
        s.current_temperature_f = None;
        let err = analyze(&s, DailyHigh::Fallback, "X", &AlertConfig::default()).unwrap_err();
        assert!(matches!(err, WeatherError::MalformedWeatherData(_)));
    }

    #[test]
    fn test_missing_description_is_malformed() {
        let mut s = snapshot(70.0, "rain");
        s.condition_description = None;
        let err = analyze(&s, DailyHigh::Fallback, "X", &AlertConfig::default()).unwrap_err();
        assert!(matches!(err, WeatherError::MalformedWeatherData(_)));
    }
}
