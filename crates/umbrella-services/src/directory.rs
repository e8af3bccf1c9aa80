//! Subscriber directory trait and error types.
//!
//! The evaluator and the subscription flow only talk to this trait; the
//! SQLite store is the one production implementation.

use chrono::{DateTime, Utc};
use thiserror::Error;
use umbrella_core::DatabaseError;

use crate::subscriber::{NewSubscription, Subscriber};

/// Errors that can occur during directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// No subscriber with that email.
    #[error("Subscriber not found: {0}")]
    NotFound(String),

    /// Validation error (e.g., malformed email, empty city).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

impl DirectoryError {
    /// Create a not found error.
    pub fn not_found(email: impl Into<String>) -> Self {
        Self::NotFound(email.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "That email was not found in our subscription list.",
            Self::Validation(_) => "Please provide a valid email address and city.",
            Self::Storage(e) => e.user_message(),
        }
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Whether an upsert inserted a new subscriber or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Store of subscribers, keyed by email.
pub trait SubscriberDirectory: Send + Sync {
    /// Active subscribers, newest subscription first.
    fn list_active(&self) -> DirectoryResult<Vec<Subscriber>>;

    /// Look up a subscriber regardless of active state.
    fn get(&self, email: &str) -> DirectoryResult<Option<Subscriber>>;

    /// Insert, or update the location of, and reactivate, an existing email.
    ///
    /// # Errors
    /// Returns `DirectoryError::Validation` if the email or city is invalid.
    fn upsert(&self, subscription: &NewSubscription, at: DateTime<Utc>)
        -> DirectoryResult<UpsertOutcome>;

    /// Stop sending to this email.
    ///
    /// # Errors
    /// Returns `DirectoryError::NotFound` if the email is unknown.
    fn deactivate(&self, email: &str) -> DirectoryResult<()>;

    /// Record a successful delivery.
    ///
    /// # Errors
    /// Returns `DirectoryError::NotFound` if the email is unknown.
    fn mark_notified(&self, email: &str, at: DateTime<Utc>) -> DirectoryResult<()>;
}

/// Maximum length of an email address (RFC 5321 path limit).
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Normalize and validate an email address.
///
/// # Errors
/// Returns `DirectoryError::Validation` if the address is empty, too long, or
/// not a syntactically valid mailbox.
pub fn normalize_email(email: &str) -> DirectoryResult<String> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(DirectoryError::validation("Email cannot be empty"));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(DirectoryError::validation(format!(
            "Email exceeds maximum length of {} characters",
            MAX_EMAIL_LENGTH
        )));
    }

    trimmed
        .parse::<lettre::Address>()
        .map_err(|e| DirectoryError::validation(format!("Invalid email address: {}", e)))?;

    Ok(trimmed.to_lowercase())
}

/// Validate the city of a subscription.
///
/// # Errors
/// Returns `DirectoryError::Validation` if the city is empty.
pub fn validate_subscription(subscription: &NewSubscription) -> DirectoryResult<()> {
    if subscription.location.city.trim().is_empty() {
        return Err(DirectoryError::validation("City cannot be empty"));
    }
    if subscription.location.country_code.trim().is_empty() {
        return Err(DirectoryError::validation("Country code cannot be empty"));
    }
    Ok(())
}
