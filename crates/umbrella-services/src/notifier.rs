//! Email delivery.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::{header::ContentType, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;
use umbrella_core::{ConfigError, EmailConfig};
use umbrella_weather::AlertAnalysis;

use crate::email::{self, MailMessage};

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("Email is not configured: {0}")]
    NotConfigured(#[from] ConfigError),

    #[error("Invalid email address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("Failed to send email: {0}")]
    Send(String),
}

impl NotifierError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "Email delivery is not set up. Set EMAIL_ADDRESS and EMAIL_PASSWORD.",
            Self::InvalidAddress { .. } => "That email address cannot receive mail.",
            Self::Build(_) => "Could not prepare the email.",
            Self::Send(_) => "The mail server could not deliver the email. Please try again later.",
        }
    }
}

/// Sends rendered emails. Implementations only need `send`.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// # Errors
    /// `InvalidAddress` for an unusable recipient, `Send` when the transport fails.
    async fn send(&self, recipient: &str, message: MailMessage) -> Result<(), NotifierError>;

    /// Email today's alerts to one subscriber, stamped with the evaluation time.
    async fn deliver(
        &self,
        recipient: &str,
        analysis: &AlertAnalysis,
        evaluated_at: DateTime<Utc>,
    ) -> Result<(), NotifierError> {
        self.send(recipient, email::alert_message(analysis, evaluated_at)).await
    }

    async fn send_welcome(
        &self,
        recipient: &str,
        location_label: &str,
        heat_threshold_f: f64,
    ) -> Result<(), NotifierError> {
        self.send(
            recipient,
            email::welcome_message(location_label, heat_threshold_f, Utc::now()),
        )
        .await
    }

    async fn send_test(&self, recipient: &str) -> Result<(), NotifierError> {
        self.send(recipient, email::test_message(Utc::now())).await
    }
}

/// SMTP delivery over STARTTLS.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Build a notifier from configuration.
    ///
    /// # Errors
    /// `NotConfigured` when the sender address or password is missing.
    pub fn new(config: &EmailConfig) -> Result<Self, NotifierError> {
        let (address, password) = config.credentials()?;

        let from = parse_mailbox(address)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
            .map_err(|e| NotifierError::Build(format!("SMTP relay {}: {}", config.smtp_server, e)))?
            .port(config.smtp_port)
            .credentials(Credentials::new(address.to_string(), password.to_string()))
            .timeout(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        tracing::debug!(
            "SMTP notifier for {} via {}:{}",
            address,
            config.smtp_server,
            config.smtp_port
        );

        Ok(Self { transport, from })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifierError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| NotifierError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

#[async_trait]
impl Notifier for SmtpNotifier {
    #[instrument(skip(self, message), fields(subject = %message.subject), level = "debug")]
    async fn send(&self, recipient: &str, message: MailMessage) -> Result<(), NotifierError> {
        let to = parse_mailbox(recipient)?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.html_body)
            .map_err(|e| NotifierError::Build(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifierError::Send(e.to_string()))?;

        tracing::info!("Email sent to {}", recipient);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, MailMessage)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, recipient: &str, message: MailMessage) -> Result<(), NotifierError> {
            self.sent.lock().push((recipient.to_string(), message));
            Ok(())
        }
    }

    #[test]
    fn test_smtp_notifier_requires_credentials() {
        let err = SmtpNotifier::new(&EmailConfig::default()).err().unwrap();
        assert!(matches!(err, NotifierError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_smtp_notifier_builds_with_credentials() {
        let config = EmailConfig {
            address: Some("alerts@example.com".into()),
            password: Some("app-password".into()),
            ..Default::default()
        };
        assert!(SmtpNotifier::new(&config).is_ok());
    }

    #[test]
    fn test_invalid_sender_address() {
        let config = EmailConfig {
            address: Some("not an address".into()),
            password: Some("pw".into()),
            ..Default::default()
        };
        assert!(matches!(
            SmtpNotifier::new(&config),
            Err(NotifierError::InvalidAddress { .. })
        ));
    }

    #[tokio::test]
    async fn test_provided_methods_render_through_send() {
        let notifier = RecordingNotifier::default();
        notifier
            .send_welcome("a@example.com", "Austin, US", 80.0)
            .await
            .unwrap();
        notifier.send_test("b@example.com").await.unwrap();

        let sent = notifier.sent.lock();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "a@example.com");
        assert!(sent[0].1.html_body.contains("What to Expect"));
        assert!(sent[1].1.subject.ends_with("Test Location"));
    }
}
