use anyhow::{Context, Result};
use std::sync::Arc;
use umbrella_core::Config;
use umbrella_services::{
    Evaluator, Notifier, SmtpNotifier, SqliteSubscriberStore, SubscriberDirectory,
    SubscriptionService, SystemClock,
};
use umbrella_weather::{OpenWeatherProvider, WeatherProvider};

/// Loaded configuration plus the services built from it.
pub struct App {
    config: Arc<Config>,
    directory: Arc<SqliteSubscriberStore>,
}

impl App {
    /// Load and validate configuration, then open the subscriber database.
    pub fn new() -> Result<Self> {
        let (config, _validation) = Config::load_validated()?;

        let directory = SqliteSubscriberStore::new(&config.database.path)
            .with_context(|| {
                format!(
                    "Failed to open subscriber database at {}",
                    config.database.path.display()
                )
            })?;

        tracing::info!(
            "Using subscriber database {}",
            config.database.path.display()
        );

        Ok(Self {
            config: Arc::new(config),
            directory: Arc::new(directory),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn directory(&self) -> Arc<SqliteSubscriberStore> {
        self.directory.clone()
    }

    /// # Errors
    /// Fails when no weather API key is configured.
    pub fn provider(&self) -> Result<Arc<dyn WeatherProvider>> {
        let provider = OpenWeatherProvider::new(&self.config.weather)
            .context("Weather provider is not available")?;
        Ok(Arc::new(provider))
    }

    /// # Errors
    /// Fails when SMTP credentials are missing.
    pub fn notifier(&self) -> Result<Arc<dyn Notifier>> {
        let notifier =
            SmtpNotifier::new(&self.config.email).context("Email delivery is not available")?;
        Ok(Arc::new(notifier))
    }

    /// Subscription flow. A missing email setup only disables welcome emails.
    pub fn subscriptions(&self) -> Result<SubscriptionService> {
        let notifier = match self.notifier() {
            Ok(notifier) => Some(notifier),
            Err(e) => {
                tracing::warn!("{:#}", e);
                None
            }
        };

        Ok(SubscriptionService::new(
            self.provider()?,
            self.directory.clone() as Arc<dyn SubscriberDirectory>,
            notifier,
            self.config.alerts.clone(),
        ))
    }

    /// The background evaluator. Requires both the weather API key and
    /// SMTP credentials.
    pub fn evaluator(&self) -> Result<Evaluator> {
        Ok(Evaluator::new(
            self.provider()?,
            self.directory.clone() as Arc<dyn SubscriberDirectory>,
            self.notifier()?,
            self.config.alerts.clone(),
            Arc::new(SystemClock),
        ))
    }
}
