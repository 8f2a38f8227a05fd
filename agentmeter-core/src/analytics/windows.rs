//! Time windows for period-scoped metrics.
//!
//! Today, this week (Monday start) and this month are anchored to local
//! midnight of the reference instant; the five-hour window is a sliding
//! lookback. All windows are open at the top, so they always include "now".

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use serde::Serialize;

/// Length of the rolling window, in milliseconds.
pub const FIVE_HOURS_MS: i64 = 5 * 60 * 60 * 1000;

/// One day, in milliseconds.
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Window start boundaries (epoch millis) for one aggregation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindows {
    pub now: i64,
    pub start_of_today: i64,
    pub start_of_week: i64,
    pub start_of_month: i64,
    pub five_hours_ago: i64,
}

/// Which windows a timestamp falls into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowFlags {
    pub today: bool,
    pub week: bool,
    pub month: bool,
    pub five_hour: bool,
}

impl TimeWindows {
    /// Boundaries relative to `now`, in `now`'s time zone.
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let days_since_monday = i64::from(today.weekday().num_days_from_monday());
        let monday = today - Duration::days(days_since_monday);
        let first_of_month = today.with_day(1).unwrap_or(today);
        let now_ms = now.timestamp_millis();

        Self {
            now: now_ms,
            start_of_today: local_midnight(&tz, today),
            start_of_week: local_midnight(&tz, monday),
            start_of_month: local_midnight(&tz, first_of_month),
            five_hours_ago: now_ms - FIVE_HOURS_MS,
        }
    }

    /// Classify a creation timestamp against every window.
    pub fn flags(&self, created_at: i64) -> WindowFlags {
        WindowFlags {
            today: created_at >= self.start_of_today,
            week: created_at >= self.start_of_week,
            month: created_at >= self.start_of_month,
            five_hour: created_at >= self.five_hours_ago,
        }
    }
}

/// Epoch millis of local midnight on `date`.
///
/// Where DST makes midnight ambiguous the earlier instant wins; where it
/// skips midnight entirely, the first hour that exists is used.
pub fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> i64 {
    let midnight = date.and_time(NaiveTime::default());
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt.timestamp_millis(),
        LocalResult::Ambiguous(earliest, _) => earliest.timestamp_millis(),
        LocalResult::None => tz
            .from_local_datetime(&(midnight + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.timestamp_millis())
            .unwrap_or_else(|| midnight.and_utc().timestamp_millis()),
    }
}

/// Local calendar date and hour (0-23) of an epoch-millis timestamp.
///
/// Timestamps outside chrono's range are clamped to the nearest
/// representable instant, so every message lands in some cell.
pub fn local_date_hour<Tz: TimeZone>(tz: &Tz, timestamp_ms: i64) -> (NaiveDate, u32) {
    let min = DateTime::<Utc>::MIN_UTC.timestamp_millis() + DAY_MS;
    let max = DateTime::<Utc>::MAX_UTC.timestamp_millis() - DAY_MS;
    let utc = Utc
        .timestamp_millis_opt(timestamp_ms.clamp(min, max))
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let local = utc.with_timezone(tz);
    (local.date_naive(), local.hour())
}
