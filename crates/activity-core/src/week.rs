//! Week bucketing.
//!
//! Weeks are 7-day chunks anchored on the weekday of January 1st
//! (Sunday = 0), not ISO-8601 weeks:
//!
//! ```text
//! week = ceil((days_since_jan1 + weekday_of_jan1 + 1) / 7)
//! ```
//!
//! Week 1 runs from January 1st to the first Saturday and may be shorter
//! than 7 days. Numbers above 53 (Dec 31st of a leap year starting on a
//! Saturday) are folded into week 53.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

pub const MAX_WEEK: u32 = 53;

fn jan1(year: i32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1).ok_or(CoreError::InvalidYear(year))
}

fn jan1_weekday(jan1: NaiveDate) -> i64 {
    i64::from(jan1.weekday().num_days_from_sunday())
}

/// Raw formula relative to `year`'s January 1st. `date` may lie outside
/// `year`; the result is then below 1 or above 53.
fn raw_week(year_start: NaiveDate, date: NaiveDate) -> i64 {
    let days = (date - year_start).num_days();
    // Ceiling division that also holds for negative numerators.
    (days + jan1_weekday(year_start) + 1 + 6).div_euclid(7)
}

/// Week number of `date` within its own calendar year, in `1..=53`.
pub fn week_number(date: NaiveDate) -> u32 {
    let year_start = date.with_ordinal(1).unwrap_or(date);
    let raw = raw_week(year_start, date);
    raw.clamp(1, i64::from(MAX_WEEK)) as u32
}

/// Week number of `date` measured against `year`'s January 1st, unclamped.
///
/// Used to check that a week's first day (which may fall in December of
/// the previous year) maps back to that week.
pub fn week_of(year: i32, date: NaiveDate) -> Result<i64> {
    Ok(raw_week(jan1(year)?, date))
}

/// First and last day of `week` in `year`: 7 consecutive days starting on
/// the Sunday on or before the week's first day in the year.
///
/// Week 53 also covers any days folded into it, so in a year where Dec 31st
/// would be week 54 it runs 8 days and ends on Dec 31st.
pub fn week_range(year: i32, week: u32) -> Result<(NaiveDate, NaiveDate)> {
    if !(1..=MAX_WEEK).contains(&week) {
        return Err(CoreError::WeekOutOfRange { year, week });
    }
    let year_start = jan1(year)?;
    let offset = i64::from(week - 1) * 7 - jan1_weekday(year_start);
    let start = year_start + Duration::days(offset);
    let mut end = start + Duration::days(6);
    if week == MAX_WEEK {
        let dec31 = jan1(year + 1)? - Duration::days(1);
        end = end.max(dec31);
    }
    Ok((start, end))
}

/// Midnight UTC on January 1st of `year` and of `year + 1`.
pub fn year_bounds(year: i32) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start = jan1(year)?.and_time(NaiveTime::MIN).and_utc();
    let end = jan1(year + 1)?.and_time(NaiveTime::MIN).and_utc();
    Ok((start, end))
}

/// `m/d - m/d`, no zero padding.
pub fn format_range(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "{}/{} - {}/{}",
        start.month(),
        start.day(),
        end.month(),
        end.day()
    )
}

// ─── WeekKey ──────────────────────────────────────────────────────────────

/// Bucket key, rendered as `YYYY-Www` (week zero-padded to 2 digits).
///
/// The derived ordering (year, then week) agrees with lexicographic order
/// of the rendered key for 4-digit years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WeekKey {
    pub year: i32,
    pub week: u32,
}

impl WeekKey {
    pub fn new(year: i32, week: u32) -> Result<Self> {
        if !(1..=MAX_WEEK).contains(&week) {
            return Err(CoreError::WeekOutOfRange { year, week });
        }
        Ok(Self { year, week })
    }

    /// Bucket of `date` within its own year.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            week: week_number(date),
        }
    }

    pub fn range(&self) -> Result<(NaiveDate, NaiveDate)> {
        week_range(self.year, self.week)
    }

    /// `m/d - m/d` label for headings.
    pub fn range_label(&self) -> Result<String> {
        let (start, end) = self.range()?;
        Ok(format_range(start, end))
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

impl FromStr for WeekKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CoreError::InvalidWeekKey(s.to_string());
        let (year, week) = s.split_once("-W").ok_or_else(invalid)?;
        if week.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let week = week.parse::<u32>().map_err(|_| invalid())?;
        WeekKey::new(year, week)
    }
}
