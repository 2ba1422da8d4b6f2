//! Spending entry and listing.

use crate::args::{AddSpendingArgs, ListSpendingArgs};
use crate::commands::{Out, OutputFormat};
use crate::error::{Error, ErrorType, IntoResult, Res};
use crate::limits::Rollover;
use crate::model::{clean_name, Month, NewSpending, Spending, TextTable};
use crate::{Config, Result};
use anyhow::Context;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// A stored spending entry and what its month's limit check did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingAdded {
    pub spending: Spending,
    pub rollover: Rollover,
}

/// Adds a spending entry to a category and checks the entry's month against its limit.
///
/// In adaptive mode, spending over the month's limit is subtracted from the following month's
/// limit. Otherwise nothing is adjusted and the message asks for the month's limit to be raised.
/// The entry and any limit adjustment are written together or not at all.
///
/// # Errors
/// - `ErrorType::Validation` if the category does not exist, the amount is negative or too large
///   to store, or an overflow cannot be carried into the next month's limit.
/// - `ErrorType::Persistence` if the database write fails.
pub async fn add_spending(config: &Config, args: AddSpendingArgs) -> Result<Out<SpendingAdded>> {
    let name = clean_name(&args.category)?;
    let db = config.db();
    let category = db
        .category_by_name(name)
        .await
        .pub_result(ErrorType::Persistence)?
        .ok_or_else(|| {
            Error::msg(
                ErrorType::Validation,
                format!("The category '{name}' does not exist"),
            )
        })?;
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let new = NewSpending::new(category.id, args.amount, date)?;

    let (mut spending, rollover) = db
        .record_spending(&config.policy(), new)
        .await
        .pub_result(ErrorType::Persistence)?;
    spending.category = Some(category.name);

    let added = format!(
        "Added {} to {} on {}",
        spending.amount,
        spending.category.as_deref().unwrap_or_default(),
        spending.date
    );
    let message = match rollover {
        Rollover::WithinLimit {
            month,
            total,
            limit,
        } => format!("{added}. {month} has spent {total} of {limit}"),
        Rollover::Carried {
            from,
            to,
            limit,
            overflow,
            next_limit,
            ..
        } => format!(
            "{added}. {from} is over its limit of {limit} by {overflow}, so the limit of {to} is \
            now {next_limit}"
        ),
        Rollover::RaiseRequired {
            month,
            total,
            limit,
            overflow,
        } => format!(
            "{added}. {month} is over its limit of {limit} by {overflow}. Raise the limit to at \
            least {total} with 'spend limit set {month} <LIMIT>'"
        ),
    };
    Ok(Out::new(message, SpendingAdded { spending, rollover }))
}

/// Spending entries in the requested output format.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rows {
    /// JSON array of spending objects.
    Json(serde_json::Value),
    /// Markdown table as a single formatted string.
    Table(String),
    /// CSV data with a header row.
    Csv(String),
}

impl Debug for Rows {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rows::Json(v) => write!(f, "Rows::Json({:?})", v),
            Rows::Table(s) => write!(f, "Rows::Table({} chars)", s.len()),
            Rows::Csv(s) => write!(f, "Rows::Csv({} chars)", s.len()),
        }
    }
}

impl Display for Rows {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rows::Json(v) => match serde_json::to_string_pretty(v) {
                Ok(s) => write!(f, "{s}"),
                Err(_) => write!(f, "{v:?}"),
            },
            Rows::Table(s) | Rows::Csv(s) => write!(f, "{s}"),
        }
    }
}

impl Rows {
    fn render(spending: &[Spending], format: OutputFormat) -> Res<Self> {
        Ok(match format {
            OutputFormat::Json => {
                Rows::Json(serde_json::to_value(spending).context("Unable to serialize spending")?)
            }
            OutputFormat::Table => {
                let mut table = TextTable::new(["Id", "Date", "Category", "Amount"]);
                for s in spending {
                    table.push([
                        s.id.to_string(),
                        s.date.to_string(),
                        s.category.clone().unwrap_or_default(),
                        s.amount.to_string(),
                    ]);
                }
                Rows::Table(table.to_string())
            }
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(Vec::new());
                writer
                    .write_record(["id", "date", "category", "amount"])
                    .context("Unable to write CSV header")?;
                for s in spending {
                    writer
                        .write_record([
                            s.id.to_string(),
                            s.date.to_string(),
                            s.category.clone().unwrap_or_default(),
                            s.amount.round().value().to_string(),
                        ])
                        .context("Unable to write CSV row")?;
                }
                let data = writer
                    .into_inner()
                    .map_err(|e| anyhow::anyhow!("Unable to finish CSV output: {}", e.error()))?;
                Rows::Csv(String::from_utf8(data).context("CSV output is not UTF-8")?)
            }
        })
    }
}

/// Lists the spending entries of a month, oldest first. Defaults to the current month.
pub async fn list_spending(config: &Config, args: ListSpendingArgs) -> Result<Out<Rows>> {
    let month = match args.month {
        Some(month) => month,
        None => Month::current()?,
    };
    let spending = config
        .db()
        .spending_in_month(month)
        .await
        .pub_result(ErrorType::Persistence)?;
    if spending.is_empty() {
        return Ok(format!("There is no spending in {month}").into());
    }
    let rows = Rows::render(&spending, args.format).pub_result(ErrorType::Persistence)?;
    Ok(Out::new(rows.to_string(), rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Amount;
    use crate::test::TestEnv;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn amount(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    fn add_args(category: &str, a: &str, date: (i32, u32, u32)) -> AddSpendingArgs {
        AddSpendingArgs {
            category: category.to_string(),
            amount: amount(a),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
        }
    }

    #[tokio::test]
    async fn test_add_spending_within_limit() {
        let env = TestEnv::with_policy("100", true).await;
        env.insert_category("Food").await;
        let out = add_spending(&env.config(), add_args("Food", "12.345", (2024, 5, 2)))
            .await
            .unwrap();
        let added = out.structure().unwrap();
        assert_eq!(added.spending.amount, amount("12.34"));
        assert_eq!(added.spending.category.as_deref(), Some("Food"));
        assert!(matches!(added.rollover, Rollover::WithinLimit { .. }));
        assert!(out.message().contains("2024.5 has spent 12.34 of 100.00"));
    }

    #[tokio::test]
    async fn test_add_spending_carries_overflow() {
        let env = TestEnv::with_policy("100", true).await;
        env.insert_category("Food").await;
        let config = env.config();
        add_spending(&config, add_args("Food", "150", (2024, 5, 2)))
            .await
            .unwrap();
        let summary = config
            .db()
            .summary(&config.policy(), Month::new(2024, 6).unwrap())
            .await
            .unwrap();
        assert_eq!(summary.limit, amount("50"));
    }

    #[tokio::test]
    async fn test_add_spending_fixed_mode_asks_for_raise() {
        let env = TestEnv::with_policy("100", false).await;
        env.insert_category("Food").await;
        let out = add_spending(&env.config(), add_args("Food", "150", (2024, 5, 2)))
            .await
            .unwrap();
        assert!(matches!(
            out.structure().unwrap().rollover,
            Rollover::RaiseRequired { .. }
        ));
        assert!(out.message().contains("spend limit set 2024.5"));
    }

    #[tokio::test]
    async fn test_add_spending_unknown_category() {
        let env = TestEnv::new().await;
        let err = add_spending(&env.config(), add_args("Nope", "1", (2024, 5, 2)))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
    }

    async fn spending_in(config: &Config, m: &str) -> Option<Rows> {
        list_spending(
            config,
            ListSpendingArgs {
                month: Some(Month::from_str(m).unwrap()),
                format: OutputFormat::Json,
            },
        )
        .await
        .unwrap()
        .structure()
        .cloned()
    }

    #[tokio::test]
    async fn test_add_spending_amount_too_large_is_validation() {
        let env = TestEnv::with_policy("100", true).await;
        env.insert_category("Food").await;
        let config = env.config();
        for huge in ["1000000000000000000000000000", "92233720368547758.08"] {
            let args = AddSpendingArgs {
                category: "Food".to_string(),
                amount: Amount::new(rust_decimal::Decimal::from_str(huge).unwrap()),
                date: NaiveDate::from_ymd_opt(2024, 5, 2),
            };
            let err = add_spending(&config, args).await.unwrap_err();
            assert_eq!(err.error_type(), ErrorType::Validation, "{huge}");
        }
        assert!(spending_in(&config, "2024.5").await.is_none());
        // The write lock was never taken, so the database is still usable.
        add_spending(&config, add_args("Food", "1", (2024, 5, 2)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_add_spending_carry_out_of_range_rolls_back() {
        let env = TestEnv::with_policy("100", true).await;
        env.insert_category("Food").await;
        env.set_limit("2024.6", "-92233720368547758.07").await;
        let config = env.config();
        let err = add_spending(&config, add_args("Food", "150", (2024, 5, 2)))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
        assert!(spending_in(&config, "2024.5").await.is_none());
    }

    #[tokio::test]
    async fn test_add_spending_negative_amount() {
        let env = TestEnv::new().await;
        env.insert_category("Food").await;
        let err = add_spending(&env.config(), add_args("Food", "-5", (2024, 5, 2)))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
        let out = list_spending(
            &env.config(),
            ListSpendingArgs {
                month: Some(Month::new(2024, 5).unwrap()),
                format: OutputFormat::Json,
            },
        )
        .await
        .unwrap();
        assert!(out.structure().is_none());
    }

    #[tokio::test]
    async fn test_list_spending_formats() {
        let env = TestEnv::new().await;
        env.insert_category("Food").await;
        let config = env.config();
        add_spending(&config, add_args("Food", "4.5", (2024, 5, 2)))
            .await
            .unwrap();
        add_spending(&config, add_args("Food", "1,000", (2024, 5, 1)))
            .await
            .unwrap();
        let month = Some(Month::new(2024, 5).unwrap());

        let csv = list_spending(
            &config,
            ListSpendingArgs {
                month,
                format: OutputFormat::Csv,
            },
        )
        .await
        .unwrap();
        let text = csv.message();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id,date,category,amount");
        assert_eq!(lines[1], "2,2024-05-01,Food,1000.00");
        assert_eq!(lines[2], "1,2024-05-02,Food,4.50");

        let json = list_spending(
            &config,
            ListSpendingArgs {
                month,
                format: OutputFormat::Json,
            },
        )
        .await
        .unwrap();
        let Some(Rows::Json(value)) = json.structure() else {
            panic!("expected JSON rows");
        };
        assert_eq!(value[0]["amount"], "1000.00");
        assert_eq!(value[0]["month"], "2024.5");

        let table = list_spending(
            &config,
            ListSpendingArgs {
                month,
                format: OutputFormat::Table,
            },
        )
        .await
        .unwrap();
        assert!(table.message().contains("1,000.00"));
    }
}
