//! Month keys: the unit that all spending and limit records are grouped by.
//!
//! A month is held as a typed `(year, month)` pair. Its string form, `"{year}.{month}"` with the
//! month NOT zero padded (`2024.1`, `2024.10`), is what gets written to the `spending.month` and
//! `month_limits.month` columns. Anything that reads those tables must parse exactly that form.

use crate::error::{Error, ErrorType};
use crate::Result;
use chrono::{Datelike, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const MAX_YEAR: i32 = 9999;

/// A calendar month. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

/// The inputs a month key can be derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthInput {
    /// The current month in local time.
    Now,
    Date(NaiveDate),
    YearMonth(i32, u32),
    /// Unix seconds, interpreted in local time.
    Timestamp(i64),
}

impl From<NaiveDate> for MonthInput {
    fn from(value: NaiveDate) -> Self {
        MonthInput::Date(value)
    }
}

impl From<(i32, u32)> for MonthInput {
    fn from((year, month): (i32, u32)) -> Self {
        MonthInput::YearMonth(year, month)
    }
}

impl From<Option<NaiveDate>> for MonthInput {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map(MonthInput::Date).unwrap_or(MonthInput::Now)
    }
}

/// Derives the month key string for `input`, e.g. `month_key((2024, 3))` is `"2024.3"`.
///
/// # Errors
/// - `ErrorType::InvalidDate` if a year/month pair or timestamp does not name a real month.
pub fn month_key(input: impl Into<MonthInput>) -> Result<String> {
    Month::resolve(input).map(|m| m.to_string())
}

impl Month {
    /// # Errors
    /// - `ErrorType::InvalidDate` unless `1 <= month <= 12` and `0 <= year <= 9999`.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::msg(
                ErrorType::InvalidDate,
                format!("Invalid month {month} in {year}.{month}, expected 1 through 12"),
            ));
        }
        if !(0..=MAX_YEAR).contains(&year) {
            return Err(Error::msg(
                ErrorType::InvalidDate,
                format!("Invalid year {year}, expected 0 through {MAX_YEAR}"),
            ));
        }
        Ok(Self { year, month })
    }

    pub fn resolve(input: impl Into<MonthInput>) -> Result<Self> {
        match input.into() {
            MonthInput::Now => Self::current(),
            MonthInput::Date(date) => Self::from_date(date),
            MonthInput::YearMonth(year, month) => Self::new(year, month),
            MonthInput::Timestamp(secs) => match Local.timestamp_opt(secs, 0).single() {
                Some(time) => Self::from_date(time.date_naive()),
                None => Err(Error::msg(
                    ErrorType::InvalidDate,
                    format!("Timestamp {secs} is out of range"),
                )),
            },
        }
    }

    /// The month that `date` falls in. Years outside `0..=9999` are `ErrorType::InvalidDate`.
    pub fn from_date(date: NaiveDate) -> Result<Self> {
        Self::new(date.year(), date.month())
    }

    pub fn current() -> Result<Self> {
        Self::from_date(Local::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following month. December rolls over to January of the next year.
    ///
    /// # Errors
    /// - `ErrorType::InvalidDate` for `9999.12`, which has no following month.
    pub fn next(&self) -> Result<Self> {
        if self.month == 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }

    pub fn day_count(&self) -> u32 {
        match self.month {
            4 | 6 | 9 | 11 => 30,
            2 if is_leap_year(self.year) => 29,
            2 => 28,
            _ => 31,
        }
    }

    /// Every date in the month, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let (year, month) = (self.year, self.month);
        (1..=self.day_count()).filter_map(move |day| NaiveDate::from_ymd_opt(year, month, day))
    }

    /// The string stored in the database, same as `to_string`.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.year, self.month)
    }
}

/// Parses either the stored key form (`2024.3`, exactly as `key` writes it) or the period form
/// `YYYY-MM` (`2024-03`).
impl FromStr for Month {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || {
            Error::msg(
                ErrorType::InvalidDate,
                format!("Unable to parse '{trimmed}' as a month, expected YYYY.M or YYYY-MM"),
            )
        };
        let digits = |p: &str| !p.is_empty() && p.len() <= 4 && p.bytes().all(|b| b.is_ascii_digit());
        let parse = |year: &str, month: &str| -> Result<Self> {
            let year = year.parse::<i32>().map_err(|_| invalid())?;
            let month = month.parse::<u32>().map_err(|_| invalid())?;
            Month::new(year, month)
        };

        if let Some((year, month)) = trimmed.split_once('.') {
            if !digits(year) || !digits(month) {
                return Err(invalid());
            }
            let parsed = parse(year, month)?;
            // Keys are unpadded, so `2024.03` or `02024.3` is not the key of any month.
            if parsed.key() != trimmed {
                return Err(invalid());
            }
            return Ok(parsed);
        }

        match trimmed.split_once('-') {
            Some((year, month)) if year.len() == 4 && month.len() == 2 => {
                if !digits(year) || !digits(month) {
                    return Err(invalid());
                }
                parse(year, month)
            }
            _ => Err(invalid()),
        }
    }
}

impl Serialize for Month {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Month::from_str(&s).map_err(serde::de::Error::custom)
    }
}
