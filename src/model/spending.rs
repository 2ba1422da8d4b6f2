use crate::error::{Error, ErrorType};
use crate::model::{Amount, Month};
use crate::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A stored spending entry.
///
/// `month` is always the month of `date`. The two are only ever written together, from a
/// `NewSpending`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Spending {
    pub id: i64,
    pub category_id: i64,
    /// Name of the owning category, filled in by queries that join it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub amount: Amount,
    pub date: NaiveDate,
    pub month: Month,
}

/// A validated spending entry that has not been stored yet.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NewSpending {
    category_id: i64,
    amount: Amount,
    date: NaiveDate,
    month: Month,
}

impl NewSpending {
    /// Rounds `amount` to cents.
    ///
    /// # Errors
    /// - `ErrorType::Validation` if the amount is negative or too large to store.
    /// - `ErrorType::InvalidDate` if the date's year has no month key.
    pub fn new(category_id: i64, amount: Amount, date: NaiveDate) -> Result<Self> {
        let month = Month::from_date(date)?;
        let amount = amount.validated()?;
        if amount.is_negative() {
            return Err(Error::msg(
                ErrorType::Validation,
                format!("The amount must not be negative, got {amount}"),
            ));
        }
        Ok(Self {
            category_id,
            amount,
            date,
            month,
        })
    }

    pub fn category_id(&self) -> i64 {
        self.category_id
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub(crate) fn into_spending(self, id: i64) -> Spending {
        Spending {
            id,
            category_id: self.category_id,
            category: None,
            amount: self.amount,
            date: self.date,
            month: self.month,
        }
    }
}
