//! Billing date alignment.
//!
//! An alignment rule moves a subscription's billing anchor onto a fixed
//! calendar point: a day of the month, a month of the year, a weekday, or
//! a combination. The rule only computes the target date; carving the
//! shortened run-up period out of a phase is `Phase::align`.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::Interval;
use crate::domain::foundation::Timestamp;

/// Base cadence a subscription bills on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl BillingFrequency {
    /// Returns the interval of one period at this frequency.
    pub fn interval(&self) -> Interval {
        match self {
            BillingFrequency::Daily => Interval::DAY,
            BillingFrequency::Weekly => Interval::WEEK,
            BillingFrequency::Monthly => Interval::MONTH,
            BillingFrequency::Yearly => Interval::YEAR,
        }
    }

    /// Returns the display name for this frequency.
    pub fn display_name(&self) -> &'static str {
        match self {
            BillingFrequency::Daily => "Daily",
            BillingFrequency::Weekly => "Weekly",
            BillingFrequency::Monthly => "Monthly",
            BillingFrequency::Yearly => "Yearly",
        }
    }
}

impl std::fmt::Display for BillingFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Rule for resolving the next aligned billing date.
///
/// Resolution applies the configured targets in a fixed order: day of the
/// month first, then month of the year, then weekday. The order matters:
/// a yearly rule for "March 1" must settle the day before rolling into the
/// target month, and weekday alignment always lands on the *next*
/// occurrence, never the base day itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentRule {
    frequency: BillingFrequency,
    weekday: Option<Weekday>,
    month_day: Option<u32>,
    month: Option<u32>,
}

impl AlignmentRule {
    /// Creates a rule with no targets; `next_date` then only normalizes
    /// the base date to midnight.
    pub fn new(frequency: BillingFrequency) -> Self {
        Self {
            frequency,
            weekday: None,
            month_day: None,
            month: None,
        }
    }

    /// Sets the target weekday.
    pub fn with_weekday(mut self, weekday: Weekday) -> Self {
        self.weekday = Some(weekday);
        self
    }

    /// Sets the target day of the month, clamped to 1-31.
    pub fn with_month_day(mut self, day: u32) -> Self {
        self.month_day = Some(day.clamp(1, 31));
        self
    }

    /// Sets the target month, clamped to 1-12.
    pub fn with_month(mut self, month: u32) -> Self {
        self.month = Some(month.clamp(1, 12));
        self
    }

    /// Returns the billing frequency.
    pub fn frequency(&self) -> BillingFrequency {
        self.frequency
    }

    /// Returns the target weekday, if any.
    pub fn weekday(&self) -> Option<Weekday> {
        self.weekday
    }

    /// Returns the target day of the month, if any.
    pub fn month_day(&self) -> Option<u32> {
        self.month_day
    }

    /// Returns the target month, if any.
    pub fn month(&self) -> Option<u32> {
        self.month
    }

    /// Resolves the first aligned date on or after `base`.
    ///
    /// The result is always midnight UTC. Targets already passed within
    /// their cycle roll forward (day into the next month, month into the
    /// next year); weekday targets are exclusive of the base day.
    pub fn next_date(&self, base: Timestamp) -> Timestamp {
        let mut date = base.at_midnight();

        // Weekly cadences align by weekday alone.
        if self.frequency != BillingFrequency::Weekly {
            if let Some(day) = self.month_day {
                date = advance_to_month_day(date, day);
            }
        }

        if let Some(month) = self.month {
            if date.month() > month {
                date = date.add_months(12);
            }
            if date.month() != month {
                date = set_month_clamped(date, month);
            }
        }

        if let Some(weekday) = self.weekday {
            // "Next Tuesday" on a Tuesday is a week out, not today.
            date = date.add_days(1);
            while date.weekday() != weekday {
                date = date.add_days(1);
            }
        }

        date
    }
}

/// Moves to the target day of the month, rolling into the next month when
/// the base day has already passed. Months without the target day (the
/// 31st in February) are skipped.
fn advance_to_month_day(date: Timestamp, day: u32) -> Timestamp {
    let mut candidate = date;
    if candidate.day() > day {
        candidate = first_of_next_month(candidate);
    }
    for _ in 0..12 {
        if let Some(aligned) = candidate.with_day(day) {
            return aligned;
        }
        candidate = first_of_next_month(candidate);
    }
    candidate
}

fn first_of_next_month(date: Timestamp) -> Timestamp {
    date.with_day(1).map(|d| d.add_months(1)).unwrap_or(date)
}

/// Sets the month, clamping the day to the end of the target month when it
/// does not exist there.
fn set_month_clamped(date: Timestamp, month: u32) -> Timestamp {
    if let Some(set) = date.with_month(month) {
        return set;
    }
    date.with_day(1)
        .and_then(|first| first.with_month(month))
        .map(|first| first.add_months(1).add_days(-1))
        .unwrap_or(date)
}
