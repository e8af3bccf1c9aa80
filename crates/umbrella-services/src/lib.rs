//! Subscriber-facing services: the directory, email delivery, the
//! subscription flow and the background evaluator.

pub mod directory;
pub mod email;
pub mod notifier;
pub mod scheduler;
pub mod subscriber;
pub mod subscriber_store;
pub mod subscription;

#[cfg(test)]
mod testing;

pub use directory::{DirectoryError, DirectoryResult, SubscriberDirectory, UpsertOutcome};
pub use email::MailMessage;
pub use notifier::{Notifier, NotifierError, SmtpNotifier};
pub use scheduler::{
    analyze_snapshot, preview_location, Clock, EvaluationError, Evaluator, SubscriberOutcome,
    SystemClock, TickReport,
};
pub use subscriber::{NewSubscription, Subscriber};
pub use subscriber_store::SqliteSubscriberStore;
pub use subscription::{
    SubscribeReceipt, SubscriptionError, SubscriptionService, SubscriptionStatus,
};
