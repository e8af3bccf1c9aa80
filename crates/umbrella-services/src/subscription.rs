//! Subscribe / unsubscribe / status.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use umbrella_core::AlertConfig;
use umbrella_weather::{resolve_location, LocationQuery, WeatherError, WeatherProvider};

use crate::directory::{
    normalize_email, validate_subscription, DirectoryError, SubscriberDirectory, UpsertOutcome,
};
use crate::notifier::Notifier;
use crate::subscriber::NewSubscription;

#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl SubscriptionError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Weather(e) => e.user_message(),
            Self::Directory(e) => e.user_message(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeReceipt {
    pub outcome: UpsertOutcome,
    pub location_label: String,
    /// False when no notifier is configured or the welcome email failed
    pub welcome_sent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Active { location_label: String },
    Inactive { location_label: String },
    NotFound,
}

pub struct SubscriptionService {
    provider: Arc<dyn WeatherProvider>,
    directory: Arc<dyn SubscriberDirectory>,
    notifier: Option<Arc<dyn Notifier>>,
    rules: AlertConfig,
}

impl SubscriptionService {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        directory: Arc<dyn SubscriberDirectory>,
        notifier: Option<Arc<dyn Notifier>>,
        rules: AlertConfig,
    ) -> Self {
        Self {
            provider,
            directory,
            notifier,
            rules,
        }
    }

    /// Subscribe `email` to daily alerts for a location.
    ///
    /// Re-subscribing an existing email moves it to the new location and
    /// reactivates it. A failed welcome email does not undo the subscription.
    ///
    /// # Errors
    /// `Directory(Validation)` for a bad email or empty city,
    /// `Weather(LocationNotFound)` when the provider does not know the place.
    pub async fn subscribe(
        &self,
        email: &str,
        city: &str,
        zipcode: Option<&str>,
        country_code: Option<&str>,
    ) -> Result<SubscribeReceipt, SubscriptionError> {
        let email = normalize_email(email)?;
        let subscription = NewSubscription::new(email, LocationQuery::new(city, zipcode, country_code));
        validate_subscription(&subscription)?;

        resolve_location(self.provider.as_ref(), &subscription.location).await?;

        let outcome = self.directory.upsert(&subscription, Utc::now())?;
        let location_label = subscription.location.label();
        tracing::info!(
            "Subscriber {} {:?} for {}",
            subscription.email,
            outcome,
            location_label
        );

        let welcome_sent = self
            .send_welcome(&subscription.email, &location_label)
            .await;

        Ok(SubscribeReceipt {
            outcome,
            location_label,
            welcome_sent,
        })
    }

    async fn send_welcome(&self, email: &str, location_label: &str) -> bool {
        let Some(notifier) = &self.notifier else {
            tracing::warn!(
                "Email is not configured; welcome email not sent to {}",
                email
            );
            return false;
        };

        match notifier
            .send_welcome(email, location_label, self.rules.heat_threshold_f)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to send welcome email to {}: {}", email, e);
                false
            }
        }
    }

    /// # Errors
    /// `Directory(NotFound)` when the email was never subscribed.
    pub fn unsubscribe(&self, email: &str) -> Result<(), SubscriptionError> {
        self.directory.deactivate(email)?;
        tracing::info!("Unsubscribed {}", email.trim());
        Ok(())
    }

    pub fn status(&self, email: &str) -> Result<SubscriptionStatus, SubscriptionError> {
        let status = match self.directory.get(email)? {
            Some(s) if s.active => SubscriptionStatus::Active {
                location_label: s.location_query().label(),
            },
            Some(s) => SubscriptionStatus::Inactive {
                location_label: s.location_query().label(),
            },
            None => SubscriptionStatus::NotFound,
        };
        Ok(status)
    }
}
