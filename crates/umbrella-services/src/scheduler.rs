//! Daily alert evaluator.
//!
//! Every tick walks the active subscribers one at a time. A subscriber is
//! emailed when it is 08:00 in the timezone of their location and today's
//! analysis carries at least one alert. Failures are logged and the
//! subscriber is simply tried again on the next tick.

use chrono::{DateTime, DurationRound, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use umbrella_core::AlertConfig;
use umbrella_weather::{
    analyze, daily_high, is_local_eight_am, local_now, next_local_eight_am, resolve_timezone,
    should_notify, AlertAnalysis, LocationQuery, WeatherError, WeatherProvider, WeatherSnapshot,
};

use crate::directory::{DirectoryError, SubscriberDirectory};
use crate::notifier::{Notifier, NotifierError};
use crate::subscriber::Subscriber;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("Weather lookup failed: {0}")]
    Weather(#[from] WeatherError),

    #[error("Delivery failed: {0}")]
    Notifier(#[from] NotifierError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
}

impl EvaluationError {
    /// Whether the next tick may succeed with nothing changed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Weather(e) => e.is_transient(),
            Self::Notifier(NotifierError::Send(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberOutcome {
    /// Not 08:00 at the subscriber's location
    NotDue,
    /// Already emailed inside the current 08:00 minute
    AlreadyNotified,
    NoAlerts,
    Notified,
}

/// Counts for one pass over the directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub evaluated: usize,
    pub notified: usize,
    pub not_due: usize,
    pub already_notified: usize,
    pub no_alerts: usize,
    pub failed: usize,
}

impl TickReport {
    fn record(&mut self, outcome: SubscriberOutcome) {
        match outcome {
            SubscriberOutcome::NotDue => self.not_due += 1,
            SubscriberOutcome::AlreadyNotified => self.already_notified += 1,
            SubscriberOutcome::NoAlerts => self.no_alerts += 1,
            SubscriberOutcome::Notified => self.notified += 1,
        }
    }

    pub fn log(&self) {
        if self.notified > 0 || self.failed > 0 || self.no_alerts > 0 {
            tracing::info!(
                evaluated = self.evaluated,
                notified = self.notified,
                no_alerts = self.no_alerts,
                already_notified = self.already_notified,
                failed = self.failed,
                "Evaluation pass complete"
            );
        } else {
            tracing::debug!(
                evaluated = self.evaluated,
                not_due = self.not_due,
                "Evaluation pass complete"
            );
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Honor the 08:00 gate and skip anyone already emailed in that minute
    Scheduled,
    /// Evaluate everyone right now
    Broadcast,
}

/// Start of the minute containing `now`.
fn trigger_minute_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.duration_trunc(chrono::Duration::minutes(1)).unwrap_or(now)
}

/// Fetch the forecast for `query` and decide today's alerts in `tz`.
///
/// # Errors
/// Provider errors, or `MalformedWeatherData` from the snapshot.
pub async fn analyze_snapshot(
    provider: &dyn WeatherProvider,
    query: &LocationQuery,
    snapshot: &WeatherSnapshot,
    tz: Tz,
    now: DateTime<Utc>,
    rules: &AlertConfig,
) -> Result<AlertAnalysis, WeatherError> {
    let forecast = provider.fetch_forecast(query).await?;
    let today = local_now(tz, now).date_naive();
    let high = daily_high(&forecast, today, tz);
    if high.is_fallback() {
        tracing::debug!("No forecast samples for {} on {}; using fallback high", query, today);
    }
    analyze(snapshot, high, &query.label(), rules)
}

/// Current conditions plus today's analysis for a location, without sending.
pub async fn preview_location(
    provider: &dyn WeatherProvider,
    query: &LocationQuery,
    now: DateTime<Utc>,
    rules: &AlertConfig,
) -> Result<(AlertAnalysis, Tz), WeatherError> {
    let snapshot = provider.fetch_current(query).await?;
    let tz = resolve_timezone(snapshot.utc_offset()?);
    let analysis = analyze_snapshot(provider, query, &snapshot, tz, now, rules).await?;
    Ok((analysis, tz))
}

pub struct Evaluator {
    provider: Arc<dyn WeatherProvider>,
    directory: Arc<dyn SubscriberDirectory>,
    notifier: Arc<dyn Notifier>,
    rules: AlertConfig,
    clock: Arc<dyn Clock>,
}

impl Evaluator {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        directory: Arc<dyn SubscriberDirectory>,
        notifier: Arc<dyn Notifier>,
        rules: AlertConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            directory,
            notifier,
            rules,
            clock,
        }
    }

    /// One scheduled pass: only subscribers at local 08:00 are considered.
    pub async fn run_tick(&self) -> TickReport {
        self.pass(Pass::Scheduled).await
    }

    /// Evaluate and notify every active subscriber now, ignoring the 08:00
    /// gate. A broadcast does not hold back that day's scheduled alert.
    pub async fn broadcast_now(&self) -> TickReport {
        self.pass(Pass::Broadcast).await
    }

    /// Run scheduled passes every `tick` until `cancel` fires.
    pub async fn run(&self, tick: Duration, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Evaluator started (tick every {:?})", tick);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Evaluator stopping");
                    break;
                }
                _ = interval.tick() => {
                    self.run_tick().await.log();
                }
            }
        }
    }

    async fn pass(&self, pass: Pass) -> TickReport {
        let now = self.clock.now();
        let mut report = TickReport::default();

        let subscribers = match self.directory.list_active() {
            Ok(subscribers) => subscribers,
            Err(e) => {
                tracing::error!("Failed to list subscribers: {}", e);
                return report;
            }
        };

        for subscriber in &subscribers {
            report.evaluated += 1;
            match self.evaluate(subscriber, now, pass).await {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        email = %subscriber.email,
                        city = %subscriber.city,
                        transient = e.is_transient(),
                        "Skipping subscriber: {}",
                        e
                    );
                }
            }
        }

        report
    }

    /// Scheduled evaluation of one subscriber at `now`.
    ///
    /// # Errors
    /// Provider, delivery or directory failures. Nothing is recorded on error.
    pub async fn evaluate_subscriber(
        &self,
        subscriber: &Subscriber,
        now: DateTime<Utc>,
    ) -> Result<SubscriberOutcome, EvaluationError> {
        self.evaluate(subscriber, now, Pass::Scheduled).await
    }

    async fn evaluate(
        &self,
        subscriber: &Subscriber,
        now: DateTime<Utc>,
        pass: Pass,
    ) -> Result<SubscriberOutcome, EvaluationError> {
        let query = subscriber.location_query();
        let snapshot = self.provider.fetch_current(&query).await?;
        let tz = resolve_timezone(snapshot.utc_offset()?);

        if pass == Pass::Scheduled {
            if !is_local_eight_am(tz, now) {
                tracing::trace!(
                    "{} not due until {}",
                    subscriber.email,
                    next_local_eight_am(tz, now)
                );
                return Ok(SubscriberOutcome::NotDue);
            }

            let window_start = trigger_minute_start(now);
            if subscriber
                .last_notified_at
                .is_some_and(|at| at >= window_start)
            {
                return Ok(SubscriberOutcome::AlreadyNotified);
            }
        }

        let analysis =
            analyze_snapshot(self.provider.as_ref(), &query, &snapshot, tz, now, &self.rules)
                .await?;

        if !should_notify(&analysis) {
            tracing::debug!(
                "No alerts for {} ({}, high {:.1}°F)",
                subscriber.email,
                analysis.condition_description,
                analysis.daily_high_f
            );
            return Ok(SubscriberOutcome::NoAlerts);
        }

        self.notifier
            .deliver(&subscriber.email, &analysis, now)
            .await?;
        self.directory.mark_notified(&subscriber.email, now)?;

        tracing::info!(
            "Alert sent to {} for {}: {:?}",
            subscriber.email,
            analysis.location_label,
            analysis.alerts
        );
        Ok(SubscriberOutcome::Notified)
    }
}
