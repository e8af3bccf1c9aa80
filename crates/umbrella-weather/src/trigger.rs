//! The once-a-day 8:00 AM gate.
//!
//! The evaluator ticks about once a minute, so the gate is open for exactly
//! one civil minute per day in each timezone. A missed minute is a missed day.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

pub const TRIGGER_HOUR: u32 = 8;
pub const TRIGGER_MINUTE: u32 = 0;

/// `now` expressed as civil time in `tz`.
pub fn local_now(tz: Tz, now: DateTime<Utc>) -> DateTime<Tz> {
    now.with_timezone(&tz)
}

/// True iff the local wall clock in `tz` reads 08:00, at minute precision.
pub fn is_local_eight_am(tz: Tz, now: DateTime<Utc>) -> bool {
    let local = local_now(tz, now);
    local.hour() == TRIGGER_HOUR && local.minute() == TRIGGER_MINUTE
}

/// The next instant, strictly after the current minute, at which the gate opens.
///
/// Days whose 08:00 does not exist locally (a DST gap) are skipped.
pub fn next_local_eight_am(tz: Tz, now: DateTime<Utc>) -> DateTime<Tz> {
    let trigger = NaiveTime::from_hms_opt(TRIGGER_HOUR, TRIGGER_MINUTE, 0).unwrap_or(NaiveTime::MIN);
    let local = local_now(tz, now);
    let mut date = local.date_naive();

    if local.time() >= trigger {
        date = date.succ_opt().unwrap_or(date);
    }

    // A DST gap swallows 08:00 at most once in a row; two days is plenty.
    for _ in 0..3 {
        if let Some(candidate) = tz.from_local_datetime(&date.and_time(trigger)).earliest() {
            return candidate;
        }
        date = date.succ_opt().unwrap_or(date);
    }

    local + Duration::days(1)
}
