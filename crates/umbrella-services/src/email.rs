//! HTML email rendering.
//!
//! Builds the subject and body of alert, welcome and test emails. Anything
//! that came from a subscriber or the weather provider is escaped.

use chrono::{DateTime, Utc};
use std::fmt::Write;
use umbrella_weather::AlertAnalysis;

const STYLE: &str = r#"
        body { font-family: Arial, sans-serif; margin: 20px; }
        .header { background-color: #f0f8ff; padding: 15px; border-radius: 5px; }
        .alert { background-color: #fff3cd; border: 1px solid #ffeaa7; padding: 15px; margin: 10px 0; border-radius: 5px; }
        .weather-info { background-color: #e8f5e8; padding: 15px; border-radius: 5px; margin: 10px 0; }
        .welcome { background-color: #e8f5e8; padding: 15px; border-radius: 5px; margin: 10px 0; }
        .footer { color: #666; font-size: 12px; margin-top: 20px; }
"#;

pub const TEST_LOCATION: &str = "Test Location";
pub const TEST_NOTIFICATION: &str = "🧪 This is a test notification to verify your email setup!";

/// A rendered email, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub subject: String,
    pub html_body: String,
}

pub fn subject_for(location_label: &str) -> String {
    format!("☔ UmbrellaAlert - Weather Update for {}", location_label)
}

/// Daily alert email for one subscriber.
pub fn alert_message(analysis: &AlertAnalysis, sent_at: DateTime<Utc>) -> MailMessage {
    let high_note = if analysis.daily_high_is_fallback {
        " (estimated)"
    } else {
        ""
    };

    let mut html = header(
        "🌤️ Weather Alert",
        &analysis.location_label,
        sent_at,
    );
    let _ = write!(
        html,
        r#"
    <div class="weather-info">
        <h3>Weather Conditions:</h3>
        <p><strong>Current Temperature:</strong> {:.1}°F</p>
        <p><strong>Daily High:</strong> {:.1}°F{}</p>
        <p><strong>Condition:</strong> {}</p>
    </div>

    <div class="alert">
        <h3>⚠️ Important Reminders:</h3>
        <ul>
{}        </ul>
    </div>
"#,
        analysis.current_temperature_f,
        analysis.daily_high_f,
        high_note,
        escape_html(&title_case(&analysis.condition_description)),
        list_items(&analysis.alerts),
    );
    html.push_str(&footer("This notification was sent by UmbrellaAlert"));

    MailMessage {
        subject: subject_for(&analysis.location_label),
        html_body: html,
    }
}

/// Confirmation sent right after subscribing.
pub fn welcome_message(
    location_label: &str,
    heat_threshold_f: f64,
    sent_at: DateTime<Utc>,
) -> MailMessage {
    let items = vec![
        "🎉 Welcome to UmbrellaAlert!".to_string(),
        format!("📍 You will receive daily weather alerts for {}", location_label),
        "🌧️ Umbrella alerts when rain is expected".to_string(),
        format!("☀️ Sunscreen alerts when temperature > {}°F", heat_threshold_f),
        "⏰ Daily checks at 8:00 AM in your local timezone".to_string(),
        "📧 You will only receive emails when alerts are needed!".to_string(),
    ];

    let mut html = header("🎉 Welcome to UmbrellaAlert!", location_label, sent_at);
    let _ = write!(
        html,
        r#"
    <div class="welcome">
        <h3>📧 What to Expect:</h3>
        <ul>
{}        </ul>
    </div>
"#,
        list_items(&items),
    );
    html.push_str(&footer(
        "You're all set! You'll receive daily weather alerts at 8:00 AM in your local timezone.",
    ));

    MailMessage {
        subject: subject_for(location_label),
        html_body: html,
    }
}

/// Email used to check SMTP settings.
pub fn test_message(sent_at: DateTime<Utc>) -> MailMessage {
    let mut html = header("🌤️ Weather Alert", TEST_LOCATION, sent_at);
    let _ = write!(
        html,
        r#"
    <div class="alert">
        <h3>⚠️ Important Reminders:</h3>
        <ul>
{}        </ul>
    </div>
"#,
        list_items(&[TEST_NOTIFICATION.to_string()]),
    );
    html.push_str(&footer("This notification was sent by UmbrellaAlert"));

    MailMessage {
        subject: subject_for(TEST_LOCATION),
        html_body: html,
    }
}

fn header(title: &str, location_label: &str, sent_at: DateTime<Utc>) -> String {
    format!(
        r#"<html>
<head>
    <style>{}    </style>
</head>
<body>
    <div class="header">
        <h2>{}</h2>
        <p><strong>Location:</strong> {}</p>
        <p><strong>Time:</strong> {}</p>
    </div>
"#,
        STYLE,
        title,
        escape_html(location_label),
        sent_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

fn footer(line: &str) -> String {
    format!(
        r#"
    <div class="footer">
        <p>{}</p>
        <p>Stay safe and prepared! ☔☀️</p>
    </div>
</body>
</html>
"#,
        line
    )
}

fn list_items(items: &[String]) -> String {
    items.iter().fold(String::new(), |mut out, item| {
        let _ = writeln!(out, "            <li>{}</li>", escape_html(item));
        out
    })
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Uppercase the first letter of each word, lowercase the rest.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut at_word_start = true;
    for c in input.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use umbrella_weather::analysis::UMBRELLA_ALERT;

    fn sent_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 13, 0, 0).unwrap()
    }

    fn analysis() -> AlertAnalysis {
        AlertAnalysis {
            location_label: "Nashville, US".into(),
            current_temperature_f: 72.04,
            daily_high_f: 78.46,
            daily_high_is_fallback: false,
            condition_main: "rain".into(),
            condition_description: "light rain".into(),
            alerts: vec![UMBRELLA_ALERT.to_string()],
        }
    }

    #[test]
    fn test_alert_message_contents() {
        let msg = alert_message(&analysis(), sent_at());
        assert_eq!(msg.subject, "☔ UmbrellaAlert - Weather Update for Nashville, US");
        assert!(msg.html_body.contains("<strong>Current Temperature:</strong> 72.0°F"));
        assert!(msg.html_body.contains("<strong>Daily High:</strong> 78.5°F</p>"));
        assert!(msg.html_body.contains("<strong>Condition:</strong> Light Rain"));
        assert!(msg.html_body.contains("<li>🌧️ Bring an umbrella! Rain is expected.</li>"));
        assert!(msg.html_body.contains("2024-06-10 13:00:00 UTC"));
    }

    #[test]
    fn test_alert_message_marks_estimated_high() {
        let mut a = analysis();
        a.daily_high_f = 75.0;
        a.daily_high_is_fallback = true;
        let msg = alert_message(&a, sent_at());
        assert!(msg.html_body.contains("75.0°F (estimated)"));
    }

    #[test]
    fn test_location_is_escaped() {
        let mut a = analysis();
        a.location_label = "<script>alert(1)</script>, US".into();
        let msg = alert_message(&a, sent_at());
        assert!(!msg.html_body.contains("<script>"));
        assert!(msg.html_body.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_welcome_message_lists_expectations() {
        let msg = welcome_message("Austin, 78701, US", 80.0, sent_at());
        assert_eq!(msg.subject, "☔ UmbrellaAlert - Weather Update for Austin, 78701, US");
        assert!(msg.html_body.contains("What to Expect"));
        assert!(msg
            .html_body
            .contains("You will receive daily weather alerts for Austin, 78701, US"));
        assert!(msg.html_body.contains("temperature &gt; 80°F"));
        assert!(msg.html_body.contains("8:00 AM"));
    }

    #[test]
    fn test_test_message() {
        let msg = test_message(sent_at());
        assert_eq!(msg.subject, "☔ UmbrellaAlert - Weather Update for Test Location");
        assert!(msg.html_body.contains(TEST_NOTIFICATION));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"a & b <c> "d" 'e'"#), "a &amp; b &lt;c&gt; &quot;d&quot; &#39;e&#39;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("light rain"), "Light Rain");
        assert_eq!(title_case("THUNDERSTORM with heavy-rain"), "Thunderstorm With Heavy-Rain");
        assert_eq!(title_case(""), "");
    }
}
