//! In-memory fakes of the provider, directory and notifier traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use umbrella_weather::{
    ForecastSeries, LocationQuery, WeatherError, WeatherProvider, WeatherSnapshot,
};

use crate::directory::{
    normalize_email, validate_subscription, DirectoryError, DirectoryResult, SubscriberDirectory,
    UpsertOutcome,
};
use crate::email::MailMessage;
use crate::notifier::{Notifier, NotifierError};
use crate::subscriber::{NewSubscription, Subscriber};

/// Provider answering from per-city tables. Unknown cities are `LocationNotFound`.
#[derive(Default)]
pub struct FakeProvider {
    current: Mutex<HashMap<String, WeatherSnapshot>>,
    forecasts: Mutex<HashMap<String, ForecastSeries>>,
    failing: Mutex<HashSet<String>>,
    pub current_calls: AtomicUsize,
    pub forecast_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn with_city(self, city: &str, snapshot: WeatherSnapshot, forecast: ForecastSeries) -> Self {
        self.current.lock().insert(city.to_string(), snapshot);
        self.forecasts.lock().insert(city.to_string(), forecast);
        self
    }

    /// Make every call for `city` fail with a transient error.
    pub fn fail_city(&self, city: &str) {
        self.failing.lock().insert(city.to_string());
    }

    fn check(&self, query: &LocationQuery) -> Result<(), WeatherError> {
        if self.failing.lock().contains(&query.city) {
            return Err(WeatherError::Transient(umbrella_core::NetworkError::Timeout));
        }
        Ok(())
    }
}

#[async_trait]
impl WeatherProvider for FakeProvider {
    async fn fetch_current(&self, query: &LocationQuery) -> Result<WeatherSnapshot, WeatherError> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        self.check(query)?;
        self.current
            .lock()
            .get(&query.city)
            .cloned()
            .ok_or_else(|| WeatherError::LocationNotFound(query.label()))
    }

    async fn fetch_forecast(&self, query: &LocationQuery) -> Result<ForecastSeries, WeatherError> {
        self.forecast_calls.fetch_add(1, Ordering::SeqCst);
        self.check(query)?;
        self.forecasts
            .lock()
            .get(&query.city)
            .cloned()
            .ok_or_else(|| WeatherError::LocationNotFound(query.label()))
    }
}

#[derive(Default)]
pub struct MemoryDirectory {
    rows: Mutex<Vec<Subscriber>>,
}

impl MemoryDirectory {
    pub fn all(&self) -> Vec<Subscriber> {
        self.rows.lock().clone()
    }
}

impl SubscriberDirectory for MemoryDirectory {
    fn list_active(&self) -> DirectoryResult<Vec<Subscriber>> {
        let mut active: Vec<Subscriber> =
            self.rows.lock().iter().filter(|s| s.active).cloned().collect();
        active.sort_by(|a, b| b.subscribed_at.cmp(&a.subscribed_at));
        Ok(active)
    }

    fn get(&self, email: &str) -> DirectoryResult<Option<Subscriber>> {
        let email = normalize_email(email)?;
        Ok(self.rows.lock().iter().find(|s| s.email == email).cloned())
    }

    fn upsert(
        &self,
        subscription: &NewSubscription,
        at: DateTime<Utc>,
    ) -> DirectoryResult<UpsertOutcome> {
        let email = normalize_email(&subscription.email)?;
        validate_subscription(subscription)?;
        let location = &subscription.location;

        let mut rows = self.rows.lock();
        if let Some(existing) = rows.iter_mut().find(|s| s.email == email) {
            existing.city = location.city.clone();
            existing.zipcode = location.zipcode.clone();
            existing.country_code = location.country_code.clone();
            existing.subscribed_at = at;
            existing.active = true;
            return Ok(UpsertOutcome::Updated);
        }

        let id = rows.len() as i64 + 1;
        rows.push(Subscriber {
            id,
            email,
            city: location.city.clone(),
            zipcode: location.zipcode.clone(),
            country_code: location.country_code.clone(),
            active: true,
            subscribed_at: at,
            last_notified_at: None,
        });
        Ok(UpsertOutcome::Created)
    }

    fn deactivate(&self, email: &str) -> DirectoryResult<()> {
        let email = normalize_email(email)?;
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|s| s.email == email)
            .ok_or_else(|| DirectoryError::not_found(&email))?;
        row.active = false;
        Ok(())
    }

    fn mark_notified(&self, email: &str, at: DateTime<Utc>) -> DirectoryResult<()> {
        let email = normalize_email(email)?;
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|s| s.email == email)
            .ok_or_else(|| DirectoryError::not_found(&email))?;
        row.last_notified_at = Some(at);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, MailMessage)>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(to, _)| to.clone()).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &str, message: MailMessage) -> Result<(), NotifierError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifierError::Send("connection refused".to_string()));
        }
        self.sent.lock().push((recipient.to_string(), message));
        Ok(())
    }
}
