//! Calendar day identifiers.
//!
//! # Responsibility
//! - Map wall-clock time to a `YYYY-MM-DD` day key in local time.
//! - Provide day arithmetic anchored at 1970-01-01.
//!
//! # Invariants
//! - A `DayKey` always holds a valid calendar date.
//! - `day_number`, `diff_days` and `add_days` never consult wall-clock time.
//! - Parsing never panics; malformed input yields `None`.

use chrono::{Datelike, Days, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};

const DAY_KEY_FORMAT: &str = "%Y-%m-%d";
/// `num_days_from_ce()` of 1970-01-01.
const EPOCH_DAYS_FROM_CE: i64 = 719_163;

static DAY_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid day key regex"));

/// Calendar day used as the unit of daily bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

impl DayKey {
    /// Day key of the current moment in local time.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    /// Builds a key from calendar parts; `None` for impossible dates.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Parses a strict `YYYY-MM-DD` key.
    ///
    /// Surrounding whitespace, other separators and impossible dates such as
    /// `2025-02-30` are rejected.
    pub fn parse(value: &str) -> Option<Self> {
        if !DAY_KEY_RE.is_match(value) {
            return None;
        }
        NaiveDate::parse_from_str(value, DAY_KEY_FORMAT)
            .ok()
            .map(Self)
    }

    /// Parses `value`, falling back to `fallback` when it is malformed.
    pub fn parse_or(value: &str, fallback: DayKey) -> Self {
        Self::parse(value).unwrap_or(fallback)
    }

    /// Day index relative to 1970-01-01 (which is day 0).
    pub fn day_number(self) -> i64 {
        i64::from(self.0.num_days_from_ce()) - EPOCH_DAYS_FROM_CE
    }

    /// Number of days from `from` to `to` (`to - from`).
    pub fn diff_days(from: DayKey, to: DayKey) -> i64 {
        to.day_number() - from.day_number()
    }

    /// Returns the key `days` later (earlier when negative).
    ///
    /// Saturates: a result outside the supported calendar range returns
    /// `self` unchanged.
    pub fn add_days(self, days: i64) -> Self {
        let shifted = if days >= 0 {
            self.0.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            self.0.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        shifted.map(Self).unwrap_or(self)
    }
}

impl Display for DayKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(DAY_KEY_FORMAT))
    }
}

impl Serialize for DayKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DayKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid day key `{raw}`")))
    }
}
