use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use umbrella_services::{
    preview_location, Notifier, SubscriberDirectory, SubscriptionError, SubscriptionStatus,
    TickReport, UpsertOutcome,
};
use umbrella_weather::{local_now, next_local_eight_am, resolve_timezone, LocationQuery};

mod app;
mod cli;

use crate::app::App;
use crate::cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    umbrella_core::init()?;

    // Pure timezone arithmetic; no config or database needed.
    if let Command::NextRun { offset } = args.command {
        print_next_run(offset);
        return Ok(());
    }

    let app = App::new()?;

    match args.command {
        Command::Serve => serve(&app).await,
        Command::CheckNow => {
            let report = app.evaluator()?.broadcast_now().await;
            print_report(&report);
            Ok(())
        }
        Command::Subscribe {
            email,
            city,
            zipcode,
            country,
        } => {
            let service = app.subscriptions()?;
            let receipt = service
                .subscribe(&email, &city, zipcode.as_deref(), Some(country.as_str()))
                .await
                .map_err(explain)?;
            match receipt.outcome {
                UpsertOutcome::Created => {
                    println!("Subscribed {} to alerts for {}", email, receipt.location_label)
                }
                UpsertOutcome::Updated => println!(
                    "Updated {}: now receiving alerts for {}",
                    email, receipt.location_label
                ),
            }
            if !receipt.welcome_sent {
                println!("Welcome email was not sent (check EMAIL_ADDRESS / EMAIL_PASSWORD)");
            }
            Ok(())
        }
        Command::Unsubscribe { email } => {
            let service = app.subscriptions()?;
            service.unsubscribe(&email).map_err(explain)?;
            println!("{} will no longer receive weather alerts", email);
            Ok(())
        }
        Command::Status { email } => {
            let service = app.subscriptions()?;
            match service.status(&email).map_err(explain)? {
                SubscriptionStatus::Active { location_label } => {
                    println!("{} is subscribed to alerts for {}", email, location_label)
                }
                SubscriptionStatus::Inactive { location_label } => println!(
                    "{} was subscribed to {} but is currently inactive",
                    email, location_label
                ),
                SubscriptionStatus::NotFound => println!("{} is not subscribed", email),
            }
            Ok(())
        }
        Command::List => list(&app),
        Command::Preview {
            city,
            zipcode,
            country,
        } => {
            let query = LocationQuery::new(&city, zipcode.as_deref(), Some(country.as_str()));
            let provider = app.provider()?;
            let now = Utc::now();
            let (analysis, tz) =
                preview_location(provider.as_ref(), &query, now, &app.config().alerts).await?;

            println!("Location:     {}", analysis.location_label);
            println!("Timezone:     {} (local {})", tz, local_now(tz, now).format("%Y-%m-%d %H:%M"));
            println!("Current:      {:.1}°F", analysis.current_temperature_f);
            println!(
                "Daily high:   {:.1}°F{}",
                analysis.daily_high_f,
                if analysis.daily_high_is_fallback { " (estimated)" } else { "" }
            );
            println!("Condition:    {}", analysis.condition_description);
            if analysis.alerts.is_empty() {
                println!("Alerts:       none");
            } else {
                for alert in &analysis.alerts {
                    println!("Alert:        {}", alert);
                }
            }
            Ok(())
        }
        Command::TestEmail { to } => {
            app.notifier()?.send_test(&to).await?;
            println!("Test email sent to {}", to);
            Ok(())
        }
        Command::NextRun { .. } => Ok(()),
    }
}

/// Run the evaluator until Ctrl+C. Missing credentials are fatal here.
async fn serve(app: &App) -> Result<()> {
    let evaluator = app.evaluator()?;
    let tick = Duration::from_secs(app.config().scheduler.tick_seconds);
    let cancel = CancellationToken::new();

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
            }
            tracing::info!("Shutdown requested");
            cancel.cancel();
        }
    });

    evaluator.run(tick, cancel).await;
    Ok(())
}

fn list(app: &App) -> Result<()> {
    let subscribers = app.directory().list_active()?;
    if subscribers.is_empty() {
        println!("No active subscribers");
        return Ok(());
    }

    println!("{} active subscriber(s)", subscribers.len());
    for s in subscribers {
        let last = s
            .last_notified_at
            .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "  {:<32} {:<28} since {}  last alert {}",
            s.email,
            s.location_query().label(),
            s.subscribed_at.format("%Y-%m-%d"),
            last
        );
    }
    Ok(())
}

fn print_next_run(offset: i32) {
    let now = Utc::now();
    let tz = resolve_timezone(offset);
    println!("Offset {}s resolves to {}", offset, tz);
    println!("Local time now: {}", local_now(tz, now).format("%Y-%m-%d %H:%M:%S %Z"));
    println!(
        "Next 8:00 AM:   {}",
        next_local_eight_am(tz, now).format("%Y-%m-%d %H:%M %Z")
    );
}

fn print_report(report: &TickReport) {
    println!(
        "Checked {} subscriber(s): {} notified, {} without alerts, {} failed",
        report.evaluated, report.notified, report.no_alerts, report.failed
    );
}

fn explain(e: SubscriptionError) -> anyhow::Error {
    anyhow::anyhow!("{} ({})", e.user_message(), e)
}
