use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use umbrella_weather::LocationQuery;

/// A row of the subscriber directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    pub city: String,
    pub zipcode: Option<String>,
    pub country_code: String,
    pub active: bool,
    pub subscribed_at: DateTime<Utc>,
    pub last_notified_at: Option<DateTime<Utc>>,
}

impl Subscriber {
    pub fn location_query(&self) -> LocationQuery {
        LocationQuery::new(&self.city, self.zipcode.as_deref(), Some(&self.country_code))
    }
}

/// Input to `SubscriberDirectory::upsert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub email: String,
    pub location: LocationQuery,
}

impl NewSubscription {
    pub fn new(email: impl Into<String>, location: LocationQuery) -> Self {
        Self {
            email: email.into(),
            location,
        }
    }
}
