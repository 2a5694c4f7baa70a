use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DateError {
    #[error("invalid calendar date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("date arithmetic out of range")]
    OutOfRange,
}

//
// ─── STUDY DATE ────────────────────────────────────────────────────────────────
//

/// A time-zone-naive calendar day.
///
/// Study dates are compared as dates, never as strings, and always persist as
/// `YYYY-MM-DD` so stored values stay fixed-width.
///
/// # Examples
///
/// ```
/// # use study_core::date::StudyDate;
/// let today: StudyDate = "2024-01-01".parse()?;
/// let next = today.add_days(7)?;
/// assert_eq!(next.to_string(), "2024-01-08");
/// assert_eq!(today.days_until(next), 7);
/// # Ok::<(), study_core::date::DateError>(())
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StudyDate(NaiveDate);

impl StudyDate {
    /// Storage and display format.
    pub const FORMAT: &'static str = "%Y-%m-%d";

    /// Build a date from year, month and day.
    ///
    /// # Errors
    ///
    /// Returns `DateError::InvalidDate` if the triple is not a calendar day.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, DateError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| DateError::InvalidDate(format!("{year:04}-{month:02}-{day:02}")))
    }

    #[must_use]
    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Calendar day of a UTC instant (time of day discarded).
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.date_naive())
    }

    #[must_use]
    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// Calendar-day addition.
    ///
    /// # Errors
    ///
    /// Returns `DateError::OutOfRange` if the result cannot be represented.
    pub fn add_days(self, days: u32) -> Result<Self, DateError> {
        self.0
            .checked_add_days(Days::new(u64::from(days)))
            .map(Self)
            .ok_or(DateError::OutOfRange)
    }

    /// Whole days from `self` to `later` (negative when `later` is earlier).
    #[must_use]
    pub fn days_until(self, later: StudyDate) -> i64 {
        later.0.signed_duration_since(self.0).num_days()
    }
}

impl fmt::Display for StudyDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl fmt::Debug for StudyDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StudyDate({self})")
    }
}

impl FromStr for StudyDate {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // chrono's %Y/%m/%d accept signs and padding spaces; only `DDDD-DD-DD` is valid.
        let bytes = s.as_bytes();
        let digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
        if bytes.len() != 10
            || bytes[4] != b'-'
            || bytes[7] != b'-'
            || !digits(0..4)
            || !digits(5..7)
            || !digits(8..10)
        {
            return Err(DateError::InvalidDate(s.to_owned()));
        }
        NaiveDate::parse_from_str(s, Self::FORMAT)
            .map(Self)
            .map_err(|_| DateError::InvalidDate(s.to_owned()))
    }
}

impl Serialize for StudyDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StudyDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
