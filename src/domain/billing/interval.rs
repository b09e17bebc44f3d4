//! Billing interval value object.
//!
//! An interval is the spacing between billing period boundaries, expressed
//! in the ISO 8601 duration form (`P1Y2M3DT4H5M6S`). Weeks fold into days
//! during parsing, so `P2W` and `P14D` are the same interval. A leading `-`
//! marks an inverted interval that steps backwards in time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Timestamp, ValidationError};

/// Calendar distance between two billing dates.
///
/// Month and year components step by calendar length when applied, so a
/// monthly interval starting on the 31st bills on the last day of shorter
/// months. At least one component is always non-zero; a zero-length
/// interval would stall period stepping and is rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Interval {
    years: u32,
    months: u32,
    days: u32,
    hours: u32,
    minutes: u32,
    seconds: u32,
    inverted: bool,
}

impl Interval {
    /// One day.
    pub const DAY: Self = Self {
        years: 0,
        months: 0,
        days: 1,
        hours: 0,
        minutes: 0,
        seconds: 0,
        inverted: false,
    };

    /// Seven days.
    pub const WEEK: Self = Self {
        years: 0,
        months: 0,
        days: 7,
        hours: 0,
        minutes: 0,
        seconds: 0,
        inverted: false,
    };

    /// One calendar month.
    pub const MONTH: Self = Self {
        years: 0,
        months: 1,
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0,
        inverted: false,
    };

    /// One calendar year.
    pub const YEAR: Self = Self {
        years: 1,
        months: 0,
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0,
        inverted: false,
    };

    /// Creates an interval from date components.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when every component is zero.
    pub fn new(years: u32, months: u32, days: u32) -> Result<Self, ValidationError> {
        Self::from_components(years, months, days, 0, 0, 0, false)
    }

    /// Creates an interval of whole days.
    pub fn days(days: u32) -> Result<Self, ValidationError> {
        Self::new(0, 0, days)
    }

    /// Creates an interval of whole weeks.
    pub fn weeks(weeks: u32) -> Result<Self, ValidationError> {
        let days = weeks.checked_mul(7).ok_or_else(|| {
            ValidationError::invalid_format("interval", "week component overflow")
        })?;
        Self::new(0, 0, days)
    }

    /// Creates an interval of whole months.
    pub fn months(months: u32) -> Result<Self, ValidationError> {
        Self::new(0, months, 0)
    }

    /// Creates an interval of whole years.
    pub fn years(years: u32) -> Result<Self, ValidationError> {
        Self::new(years, 0, 0)
    }

    fn from_components(
        years: u32,
        months: u32,
        days: u32,
        hours: u32,
        minutes: u32,
        seconds: u32,
        inverted: bool,
    ) -> Result<Self, ValidationError> {
        if years == 0 && months == 0 && days == 0 && hours == 0 && minutes == 0 && seconds == 0 {
            return Err(ValidationError::invalid_format(
                "interval",
                "must have at least one non-zero component",
            ));
        }
        Ok(Self {
            years,
            months,
            days,
            hours,
            minutes,
            seconds,
            inverted,
        })
    }

    /// Returns the year component.
    pub fn year_component(&self) -> u32 {
        self.years
    }

    /// Returns the month component.
    pub fn month_component(&self) -> u32 {
        self.months
    }

    /// Returns the day component (weeks already folded in).
    pub fn day_component(&self) -> u32 {
        self.days
    }

    /// Checks whether this interval steps backwards in time.
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Scales every component by `times`, flipping direction for negative
    /// multipliers.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a zero multiplier: the result would be
    /// a zero-length interval, which cannot exist.
    pub fn multiply(&self, times: i32) -> Result<Self, ValidationError> {
        if times == 0 {
            return Err(ValidationError::invalid_format(
                "multiplier",
                "interval cannot be multiplied by zero",
            ));
        }
        let factor = times.unsigned_abs();
        Ok(Self {
            years: scaled(self.years, factor)?,
            months: scaled(self.months, factor)?,
            days: scaled(self.days, factor)?,
            hours: scaled(self.hours, factor)?,
            minutes: scaled(self.minutes, factor)?,
            seconds: scaled(self.seconds, factor)?,
            inverted: self.inverted != (times < 0),
        })
    }

    /// Applies this interval to a timestamp.
    ///
    /// Components apply largest first: months (calendar-aware), then days,
    /// then the time-of-day components. Inverted intervals subtract.
    pub fn add_to(&self, ts: Timestamp) -> Timestamp {
        let sign: i64 = if self.inverted { -1 } else { 1 };
        let months = i64::from(self.years) * 12 + i64::from(self.months);
        let seconds = i64::from(self.hours) * 3600
            + i64::from(self.minutes) * 60
            + i64::from(self.seconds);

        let mut result = ts;
        if months != 0 {
            result = result.add_months(sign * months);
        }
        if self.days != 0 {
            result = result.add_days(sign * i64::from(self.days));
        }
        if seconds != 0 {
            result = result.add_seconds(sign * seconds);
        }
        result
    }

    /// Returns the sequence of boundary dates starting at `start`, stepping
    /// by this interval, strictly before the optional `end`.
    pub fn boundaries(&self, start: Timestamp, end: Option<Timestamp>) -> DateSequence {
        DateSequence {
            interval: *self,
            next: Some(start),
            end,
        }
    }
}

fn scaled(component: u32, factor: u32) -> Result<u32, ValidationError> {
    component.checked_mul(factor).ok_or_else(|| {
        ValidationError::invalid_format("interval", "component overflow during multiply")
    })
}

impl FromStr for Interval {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::empty_field("interval"));
        }
        let (inverted, rest) = match s.strip_prefix('-') {
            Some(stripped) => (true, stripped),
            None => (false, s),
        };
        let rest = rest.strip_prefix('P').ok_or_else(|| {
            ValidationError::invalid_format("interval", "missing P designator")
        })?;

        let (date_part, time_part) = match rest.split_once('T') {
            Some((date, time)) => (date, time),
            None => (rest, ""),
        };

        let mut years = 0u32;
        let mut months = 0u32;
        let mut weeks = 0u32;
        let mut days = 0u32;
        let mut digits = String::new();
        let mut last_rank = 0u8;

        for c in date_part.chars() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            let rank = match c {
                'Y' => 1,
                'M' => 2,
                'W' => 3,
                'D' => 4,
                other => {
                    return Err(ValidationError::invalid_format(
                        "interval",
                        format!("unknown date designator '{}'", other),
                    ))
                }
            };
            if rank <= last_rank {
                return Err(ValidationError::invalid_format(
                    "interval",
                    format!("designator '{}' out of order", c),
                ));
            }
            let value = take_digits(&mut digits, c)?;
            match rank {
                1 => years = value,
                2 => months = value,
                3 => weeks = value,
                _ => days = value,
            }
            last_rank = rank;
        }
        if !digits.is_empty() {
            return Err(ValidationError::invalid_format(
                "interval",
                format!("trailing digits '{}' without a designator", digits),
            ));
        }

        let mut hours = 0u32;
        let mut minutes = 0u32;
        let mut seconds = 0u32;
        last_rank = 0;

        for c in time_part.chars() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            let rank = match c {
                'H' => 1,
                'M' => 2,
                'S' => 3,
                other => {
                    return Err(ValidationError::invalid_format(
                        "interval",
                        format!("unknown time designator '{}'", other),
                    ))
                }
            };
            if rank <= last_rank {
                return Err(ValidationError::invalid_format(
                    "interval",
                    format!("designator '{}' out of order", c),
                ));
            }
            let value = take_digits(&mut digits, c)?;
            match rank {
                1 => hours = value,
                2 => minutes = value,
                _ => seconds = value,
            }
            last_rank = rank;
        }
        if !digits.is_empty() {
            return Err(ValidationError::invalid_format(
                "interval",
                format!("trailing digits '{}' without a designator", digits),
            ));
        }

        let total_days = weeks
            .checked_mul(7)
            .and_then(|w| w.checked_add(days))
            .ok_or_else(|| ValidationError::invalid_format("interval", "day component overflow"))?;

        Self::from_components(years, months, total_days, hours, minutes, seconds, inverted)
    }
}

fn take_digits(digits: &mut String, designator: char) -> Result<u32, ValidationError> {
    if digits.is_empty() {
        return Err(ValidationError::invalid_format(
            "interval",
            format!("designator '{}' has no value", designator),
        ));
    }
    let value = digits.parse::<u32>().map_err(|_| {
        ValidationError::invalid_format(
            "interval",
            format!("value '{}' for '{}' is out of range", digits, designator),
        )
    })?;
    digits.clear();
    Ok(value)
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inverted {
            write!(f, "-")?;
        }
        write!(f, "P")?;
        if self.years > 0 {
            write!(f, "{}Y", self.years)?;
        }
        if self.months > 0 {
            write!(f, "{}M", self.months)?;
        }
        if self.days > 0 {
            write!(f, "{}D", self.days)?;
        }
        if self.hours > 0 || self.minutes > 0 || self.seconds > 0 {
            write!(f, "T")?;
            if self.hours > 0 {
                write!(f, "{}H", self.hours)?;
            }
            if self.minutes > 0 {
                write!(f, "{}M", self.minutes)?;
            }
            if self.seconds > 0 {
                write!(f, "{}S", self.seconds)?;
            }
        }
        Ok(())
    }
}

impl TryFrom<String> for Interval {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(interval: Interval) -> Self {
        interval.to_string()
    }
}

/// Iterator over billing boundary dates.
///
/// Yields `start`, `start + interval`, `start + 2 * interval`, ... strictly
/// before the optional end bound. A step that fails to advance ends the
/// sequence instead of looping forever.
#[derive(Debug, Clone)]
pub struct DateSequence {
    interval: Interval,
    next: Option<Timestamp>,
    end: Option<Timestamp>,
}

impl Iterator for DateSequence {
    type Item = Timestamp;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        if let Some(end) = self.end {
            if current >= end {
                self.next = None;
                return None;
            }
        }
        let following = self.interval.add_to(current);
        self.next = if following > current {
            Some(following)
        } else {
            None
        };
        Some(current)
    }
}
