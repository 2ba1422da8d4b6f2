//! Amount type for monetary values: spending amounts and month limits.
//!
//! `Amount` wraps `Decimal`. Parsing tolerates a leading currency sign and thousands separators,
//! display always uses two fractional digits and commas. In SQLite amounts are stored as integer
//! cents so that `SUM` stays exact, which bounds every amount to what fits in an `i64` of cents.

use anyhow::Context;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

use crate::error::{Error as PubError, ErrorType, Res};

/// Represents an amount of money. May be negative: month limits can be driven below zero by
/// roll-over.
///
/// # Examples
///
/// ```
/// # use spend_tracker::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("$1,250.5").unwrap();
/// assert_eq!(a.to_string(), "1,250.50");
/// assert_eq!(a, Amount::from_str("1250.50").unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// The largest amount that can be stored: `i64::MAX` cents.
    pub const MAX: Amount = Amount(Decimal::from_parts(u32::MAX, i32::MAX as u32, 0, false, 2));

    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Creates an amount from a whole number of cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Rounds to two fractional digits. Midpoints go to the even neighbour.
    pub fn round(&self) -> Self {
        let mut value = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        value.rescale(2);
        Self(value)
    }

    /// Converts to whole cents for storage, rounding first.
    pub fn to_cents(&self) -> Res<i64> {
        self.round()
            .0
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .with_context(|| format!("The amount {self} is too large to store"))
    }

    /// Returns the amount unchanged if its rounded value is within `-MAX..=MAX`.
    pub fn storable(self) -> Result<Self, AmountError> {
        if self.round().0.abs() <= Self::MAX.0 {
            Ok(self)
        } else {
            Err(AmountError::OutOfRange(self.0))
        }
    }

    /// Rounds to cents. An amount that cannot be stored is an `ErrorType::Validation` error.
    pub(crate) fn validated(self) -> crate::Result<Self> {
        self.round()
            .storable()
            .map_err(|e| PubError::new(ErrorType::Validation, e))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub enum AmountError {
    Parse(rust_decimal::Error),
    OutOfRange(Decimal),
}

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::Parse(e) => Debug::fmt(e, f),
            AmountError::OutOfRange(value) => write!(f, "OutOfRange({value})"),
        }
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::Parse(e) => Display::fmt(e, f),
            AmountError::OutOfRange(value) => write!(
                f,
                "The amount {value} is out of range, it must be between -{max} and {max}",
                max = Amount::MAX.0
            ),
        }
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AmountError::Parse(e) => Some(e),
            AmountError::OutOfRange(_) => None,
        }
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        let digits = unsigned.strip_prefix('$').unwrap_or(unsigned).replace(',', "");
        let value = Decimal::from_str(&digits).map_err(AmountError::Parse)?;
        Amount(if negative { -value } else { value }).storable()
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let rounded = self.round().0;
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        write!(
            f,
            "{sign}{}",
            format_num::format_num!(",.2", rounded.abs().to_f64().unwrap_or_default())
        )
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Plain decimal text, no separators, so that it can be read back by any JSON consumer.
        serializer.collect_str(&self.round().0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(f64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Amount::from_str(&s).map_err(serde::de::Error::custom),
            Raw::Number(n) => Decimal::try_from(n)
                .map_err(AmountError::Parse)
                .and_then(|value| Amount(value).storable())
                .map_err(serde::de::Error::custom),
        }
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Self) -> Self::Output {
        Amount(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Self::Output {
        Amount(-self.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}
