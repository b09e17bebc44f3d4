//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
///
/// Month and year arithmetic is calendar-aware: adding one month to
/// January 31 lands on the last day of February, not 30 days later.
/// Billing period boundaries depend on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Creates a midnight UTC timestamp from a calendar date.
    ///
    /// Returns None for dates that do not exist (e.g. February 30).
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        Some(Self(date.and_time(NaiveTime::MIN).and_utc()))
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Truncates to 00:00:00 UTC on the same calendar day.
    pub fn at_midnight(&self) -> Self {
        Self(self.0.date_naive().and_time(NaiveTime::MIN).and_utc())
    }

    /// Creates a new timestamp by adding the specified number of days.
    ///
    /// Negative values subtract days.
    pub fn add_days(&self, days: i64) -> Self {
        if days >= 0 {
            Self(self.0 + Days::new(days as u64))
        } else {
            Self(self.0 - Days::new(days.unsigned_abs()))
        }
    }

    /// Creates a new timestamp by adding the specified number of calendar
    /// months, clamping the day to the end of shorter months.
    ///
    /// Negative values subtract months.
    pub fn add_months(&self, months: i64) -> Self {
        if months >= 0 {
            Self(self.0 + Months::new(months as u32))
        } else {
            Self(self.0 - Months::new(months.unsigned_abs() as u32))
        }
    }

    /// Creates a new timestamp by adding the specified number of seconds.
    ///
    /// Negative values subtract seconds.
    pub fn add_seconds(&self, secs: i64) -> Self {
        Self(self.0 + Duration::seconds(secs))
    }

    /// Returns the number of whole calendar days from this date to another.
    ///
    /// Time-of-day is ignored; negative when `other` is earlier.
    pub fn days_until(&self, other: &Timestamp) -> i64 {
        (other.0.date_naive() - self.0.date_naive()).num_days()
    }

    /// Returns the calendar year.
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Returns the month number (1-12).
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Returns the day of the month (1-31).
    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// Returns the day of the week.
    pub fn weekday(&self) -> Weekday {
        self.0.weekday()
    }

    /// Replaces the day of the month, keeping the time.
    ///
    /// Returns None when the resulting date does not exist.
    pub fn with_day(&self, day: u32) -> Option<Self> {
        self.0.with_day(day).map(Self)
    }

    /// Replaces the month, keeping day and time.
    ///
    /// Returns None when the resulting date does not exist.
    pub fn with_month(&self, month: u32) -> Option<Self> {
        self.0.with_month(month).map(Self)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
