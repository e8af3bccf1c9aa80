//! SQLite-based subscriber storage.
//!
//! `SqliteSubscriberStore` is the `SubscriberDirectory` used by the service.
//! The table layout matches databases written by earlier releases, which
//! stored naive local timestamps and had no `zipcode` column.

use chrono::{DateTime, NaiveDateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use umbrella_core::{DatabaseError, RusqliteErrorExt};

use crate::directory::{
    normalize_email, validate_subscription, DirectoryError, DirectoryResult, SubscriberDirectory,
    UpsertOutcome,
};
use crate::subscriber::{NewSubscription, Subscriber};

const SELECT_COLUMNS: &str = "SELECT id, email, city, zipcode, country_code, subscribed_date, \
     last_notification, is_active FROM subscribers";

/// Timestamp layout of rows written before RFC 3339 storage.
const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// SQLite-based subscriber storage.
pub struct SqliteSubscriberStore {
    conn: Mutex<Connection>,
}

impl SqliteSubscriberStore {
    /// Open (or create) the subscriber database at the given path.
    ///
    /// Creates parent directories, the table and missing columns.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
            }
        }

        let conn = Connection::open(path).map_err(|e| e.into_database_error())?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        tracing::debug!("Opened subscriber store at {}", path.display());
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    #[cfg(test)]
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory().map_err(|e| e.into_database_error())?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.conn.lock();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS subscribers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT UNIQUE NOT NULL,
                city TEXT NOT NULL,
                zipcode TEXT,
                country_code TEXT DEFAULT 'US',
                subscribed_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                last_notification TIMESTAMP,
                is_active BOOLEAN DEFAULT 1
            );
            "#,
        )
        .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

        if !Self::has_column(&conn, "zipcode")? {
            tracing::info!("Adding zipcode column to subscribers table");
            conn.execute_batch("ALTER TABLE subscribers ADD COLUMN zipcode TEXT;")
                .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        }

        conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_subscribers_active ON subscribers(is_active, subscribed_date DESC);",
        )
        .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

        Ok(())
    }

    fn has_column(conn: &Connection, column: &str) -> Result<bool, DatabaseError> {
        let mut stmt = conn
            .prepare("PRAGMA table_info(subscribers)")
            .map_err(|e| e.into_database_error())?;
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(|e| e.into_database_error())?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.into_database_error())?;
        Ok(columns.iter().any(|name| name == column))
    }

    /// Parse a stored timestamp, accepting RFC 3339 and the legacy naive layout.
    fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, LEGACY_TIMESTAMP_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Convert a database row to a Subscriber.
    fn row_to_subscriber(row: &rusqlite::Row) -> rusqlite::Result<Subscriber> {
        let subscribed_raw: Option<String> = row.get(5)?;
        let notified_raw: Option<String> = row.get(6)?;
        let active: Option<i64> = row.get(7)?;
        let country_code: Option<String> = row.get(4)?;

        let subscribed_at = subscribed_raw
            .as_deref()
            .and_then(Self::parse_timestamp)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        Ok(Subscriber {
            id: row.get(0)?,
            email: row.get(1)?,
            city: row.get(2)?,
            zipcode: row.get::<_, Option<String>>(3)?.filter(|z| !z.trim().is_empty()),
            country_code: country_code.unwrap_or_else(|| "US".to_string()),
            active: active.unwrap_or(1) != 0,
            subscribed_at,
            last_notified_at: notified_raw.as_deref().and_then(Self::parse_timestamp),
        })
    }

    /// Number of subscribers, active or not.
    pub fn count(&self) -> DirectoryResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM subscribers", [], |row| row.get(0))
            .map_err(|e| e.into_database_error())?;
        Ok(count as usize)
    }
}

impl SubscriberDirectory for SqliteSubscriberStore {
    fn list_active(&self) -> DirectoryResult<Vec<Subscriber>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "{} WHERE is_active = 1 ORDER BY subscribed_date DESC",
                SELECT_COLUMNS
            ))
            .map_err(|e| e.into_database_error())?;

        let rows = stmt
            .query_map([], Self::row_to_subscriber)
            .map_err(|e| e.into_database_error())?;

        let subscribers = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.into_database_error())?;
        Ok(subscribers)
    }

    fn get(&self, email: &str) -> DirectoryResult<Option<Subscriber>> {
        let email = normalize_email(email)?;
        let conn = self.conn.lock();
        let subscriber = conn
            .query_row(
                &format!("{} WHERE email = ?1", SELECT_COLUMNS),
                params![email],
                Self::row_to_subscriber,
            )
            .optional()
            .map_err(|e| e.into_database_error())?;
        Ok(subscriber)
    }

    fn upsert(
        &self,
        subscription: &NewSubscription,
        at: DateTime<Utc>,
    ) -> DirectoryResult<UpsertOutcome> {
        let email = normalize_email(&subscription.email)?;
        validate_subscription(subscription)?;
        let location = &subscription.location;
        let at = at.to_rfc3339();

        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(|e| e.into_database_error())?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM subscribers WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| e.into_database_error())?;

        let outcome = if existing.is_some() {
            tx.execute(
                "UPDATE subscribers
                 SET city = ?1, zipcode = ?2, country_code = ?3, subscribed_date = ?4, is_active = 1
                 WHERE email = ?5",
                params![location.city, location.zipcode, location.country_code, at, email],
            )
            .map_err(|e| e.into_database_error())?;
            UpsertOutcome::Updated
        } else {
            tx.execute(
                "INSERT INTO subscribers (email, city, zipcode, country_code, subscribed_date, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1)",
                params![email, location.city, location.zipcode, location.country_code, at],
            )
            .map_err(|e| e.into_database_error())?;
            UpsertOutcome::Created
        };

        tx.commit().map_err(|e| e.into_database_error())?;
        tracing::debug!("Upserted subscriber {} ({:?})", email, outcome);
        Ok(outcome)
    }

    fn deactivate(&self, email: &str) -> DirectoryResult<()> {
        let email = normalize_email(email)?;
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE subscribers SET is_active = 0 WHERE email = ?1",
                params![email],
            )
            .map_err(|e| e.into_database_error())?;

        if rows == 0 {
            return Err(DirectoryError::not_found(email));
        }
        Ok(())
    }

    fn mark_notified(&self, email: &str, at: DateTime<Utc>) -> DirectoryResult<()> {
        let email = normalize_email(email)?;
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE subscribers SET last_notification = ?1 WHERE email = ?2",
                params![at.to_rfc3339(), email],
            )
            .map_err(|e| e.into_database_error())?;

        if rows == 0 {
            return Err(DirectoryError::not_found(email));
        }
        Ok(())
    }
}
