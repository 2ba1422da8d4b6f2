//! Explicit month limits.

use crate::args::{LimitRangeArgs, SetLimitArgs};
use crate::commands::Out;
use crate::db::LimitUpdate;
use crate::error::{Error, ErrorType, IntoResult};
use crate::limits::months_in_range;
use crate::model::{Month, MonthSummary};
use crate::{Config, Result};
use tracing::debug;

/// Sets the limit of one month. The limit is rounded to cents and must be at least what the month
/// has already spent.
///
/// # Errors
/// - `ErrorType::Validation` if the limit is below the month's total or too large to store.
///   Nothing is written.
/// - `ErrorType::Persistence` if the database write fails.
pub async fn set_limit(config: &Config, args: SetLimitArgs) -> Result<Out<MonthSummary>> {
    let limit = args.limit.validated()?;
    let month = args.month;
    let db = config.db();
    match db
        .set_limit(month, limit)
        .await
        .pub_result(ErrorType::Persistence)?
    {
        LimitUpdate::Written => {}
        LimitUpdate::BelowSpending { total } => {
            return Err(Error::msg(
                ErrorType::Validation,
                format!(
                    "The limit must cover the month's spending: {month} has spent {total}, \
                    which is more than {limit}"
                ),
            ))
        }
    }
    let summary = db
        .summary(&config.policy(), month)
        .await
        .pub_result(ErrorType::Persistence)?;
    Ok(Out::new(
        format!("The limit of {month} is now {}", summary.limit),
        summary,
    ))
}

/// Sets the same limit for every month from `from` through `to` inclusive, or just `from` when
/// `to` is omitted. All months are written in one transaction.
///
/// # Errors
/// - `ErrorType::InvalidRange` if `to` is not after `from`. Nothing is written.
/// - `ErrorType::Validation` if the limit is too large to store. Nothing is written.
/// - `ErrorType::Persistence` if the database write fails. Nothing is written.
pub async fn set_limit_range(config: &Config, args: LimitRangeArgs) -> Result<Out<Vec<Month>>> {
    let limit = args.limit.validated()?;
    let months = months_in_range(args.from, args.to)?;
    debug!("Setting the limit of {} months to {limit}", months.len());
    config
        .db()
        .set_limits(&months, limit)
        .await
        .pub_result(ErrorType::Persistence)?;
    let message = match months.as_slice() {
        [only] => format!("The limit of {only} is now {limit}"),
        [first, .., last] => format!(
            "The limit of the {} months from {first} through {last} is now {limit}",
            months.len()
        ),
        [] => "No months were changed".to_string(),
    };
    Ok(Out::new(message, months))
}
