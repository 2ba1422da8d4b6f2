//! Monthly limits: resolving the effective limit of a month, rolling overspend into the next
//! month, and expanding month ranges for bulk limit updates.
//!
//! The decision logic is pure (`effective_limit`, `assess`, `carried_limit`, `months_in_range`)
//! and takes the limit policy as an explicit argument. The async functions apply those decisions
//! on a database connection, which is normally inside a transaction.

use crate::db::queries;
use crate::error::{Error, ErrorType, Res};
use crate::model::{Amount, Month};
use crate::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::debug;

/// The process-wide limit settings, as loaded from `config.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LimitPolicy {
    /// The limit of every month that has no explicit limit of its own.
    #[schemars(with = "String")]
    pub default_limit: Amount,
    /// When true, spending over a month's limit is subtracted from the next month's limit. When
    /// false, the user is asked to raise the month's limit instead.
    pub adaptive_limit: bool,
}

impl LimitPolicy {
    pub fn new(default_limit: Amount, adaptive_limit: bool) -> Self {
        Self {
            default_limit: default_limit.round(),
            adaptive_limit,
        }
    }
}

/// The month's explicit limit if it has one, else the default.
pub fn effective_limit(policy: &LimitPolicy, month_limit: Option<Amount>) -> Amount {
    month_limit.unwrap_or(policy.default_limit)
}

/// Reads the effective limit of `month`. Used for both reporting and roll-over decisions.
pub(crate) async fn resolve_limit(
    conn: &mut SqliteConnection,
    policy: &LimitPolicy,
    month: Month,
) -> Res<Amount> {
    let month_limit = queries::month_limit(conn, month).await?;
    Ok(effective_limit(policy, month_limit))
}

/// Where a month stands after a new spending entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    WithinLimit,
    OverLimitAdaptive { overflow: Amount, next: Month },
    OverLimitManual { overflow: Amount },
}

/// # Errors
/// - `ErrorType::InvalidDate` if an adaptive carry is needed out of `9999.12`.
pub fn assess(
    policy: &LimitPolicy,
    month: Month,
    total: Amount,
    limit: Amount,
) -> Result<Assessment> {
    if total <= limit {
        return Ok(Assessment::WithinLimit);
    }
    let overflow = total - limit;
    Ok(if policy.adaptive_limit {
        Assessment::OverLimitAdaptive {
            overflow,
            next: month.next()?,
        }
    } else {
        Assessment::OverLimitManual { overflow }
    })
}

/// The next month's limit after `overflow` is carried into it. Not clamped at zero.
pub fn carried_limit(
    policy: &LimitPolicy,
    next_month_limit: Option<Amount>,
    overflow: Amount,
) -> Amount {
    effective_limit(policy, next_month_limit) - overflow
}

/// The outcome of checking a month against its limit after new spending was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Rollover {
    /// Spending is at or below the limit. Nothing was changed.
    WithinLimit {
        month: Month,
        total: Amount,
        limit: Amount,
    },
    /// Adaptive mode: `overflow` was subtracted from the limit of month `to`.
    Carried {
        from: Month,
        to: Month,
        total: Amount,
        limit: Amount,
        overflow: Amount,
        next_limit: Amount,
    },
    /// Fixed mode: nothing was changed and the limit of `month` should be raised by the user.
    RaiseRequired {
        month: Month,
        total: Amount,
        limit: Amount,
        overflow: Amount,
    },
}

/// Re-aggregates `month`, compares it with its limit and, in adaptive mode, carries the overflow
/// into the following month. Only one month is adjusted, even if that pushes the following month
/// over its own limit.
pub(crate) async fn rollover(
    conn: &mut SqliteConnection,
    policy: &LimitPolicy,
    month: Month,
) -> Res<Rollover> {
    let total = queries::month_total(conn, month).await?;
    let limit = resolve_limit(conn, policy, month).await?;
    let outcome = match assess(policy, month, total, limit)? {
        Assessment::WithinLimit => Rollover::WithinLimit {
            month,
            total,
            limit,
        },
        Assessment::OverLimitManual { overflow } => Rollover::RaiseRequired {
            month,
            total,
            limit,
            overflow,
        },
        Assessment::OverLimitAdaptive { overflow, next } => {
            let existing = queries::month_limit(conn, next).await?;
            let next_limit = carried_limit(policy, existing, overflow)
                .validated()
                .map_err(|e| {
                    Error::msg(
                        ErrorType::Validation,
                        format!("Unable to carry {overflow} into {next}: {e}"),
                    )
                })?;
            queries::put_month_limit(conn, next, next_limit).await?;
            Rollover::Carried {
                from: month,
                to: next,
                total,
                limit,
                overflow,
                next_limit,
            }
        }
    };
    debug!("Roll-over check for {month}: {outcome:?}");
    Ok(outcome)
}

/// Every month from `start` through `end` inclusive, or just `start` when there is no end.
///
/// # Errors
/// - `ErrorType::InvalidRange` if `end` is not strictly after `start`. An end equal to the start
///   is rejected too.
pub fn months_in_range(start: Month, end: Option<Month>) -> Result<Vec<Month>> {
    let Some(end) = end else {
        return Ok(vec![start]);
    };
    if end <= start {
        return Err(Error::msg(
            ErrorType::InvalidRange,
            format!("The end month must be strictly after the start month, got {start} to {end}"),
        ));
    }
    let mut months = vec![start];
    let mut current = start;
    while current < end {
        current = current.next()?;
        months.push(current);
    }
    Ok(months)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewSpending;
    use crate::test::TestEnv;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn amount(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    fn month(s: &str) -> Month {
        Month::from_str(s).unwrap()
    }

    fn policy(default_limit: &str, adaptive: bool) -> LimitPolicy {
        LimitPolicy::new(amount(default_limit), adaptive)
    }

    #[test]
    fn test_effective_limit() {
        let p = policy("100", false);
        assert_eq!(effective_limit(&p, None), amount("100"));
        assert_eq!(effective_limit(&p, Some(amount("80"))), amount("80"));
        assert_eq!(effective_limit(&p, Some(amount("-40"))), amount("-40"));
    }

    #[test]
    fn test_assess_at_limit_is_within() {
        let p = policy("100", true);
        assert_eq!(
            assess(&p, month("2024.5"), amount("100"), amount("100")).unwrap(),
            Assessment::WithinLimit
        );
    }

    #[test]
    fn test_assess_over_limit() {
        let adaptive = policy("100", true);
        assert_eq!(
            assess(&adaptive, month("2024.12"), amount("150"), amount("100")).unwrap(),
            Assessment::OverLimitAdaptive {
                overflow: amount("50"),
                next: month("2025.1")
            }
        );
        let fixed = policy("100", false);
        assert_eq!(
            assess(&fixed, month("2024.5"), amount("150"), amount("100")).unwrap(),
            Assessment::OverLimitManual {
                overflow: amount("50")
            }
        );
    }

    #[test]
    fn test_assess_extreme_limits_do_not_panic() {
        let p = LimitPolicy::new(-Amount::MAX, true);
        let outcome = assess(&p, month("2024.5"), Amount::MAX, -Amount::MAX).unwrap();
        assert!(matches!(outcome, Assessment::OverLimitAdaptive { .. }));
    }

    #[test]
    fn test_assess_has_nowhere_to_carry_after_last_month() {
        let p = policy("100", true);
        let err = assess(&p, month("9999.12"), amount("150"), amount("100")).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::InvalidDate);
        // Fixed mode does not need a following month.
        let fixed = policy("100", false);
        assert!(assess(&fixed, month("9999.12"), amount("150"), amount("100")).is_ok());
    }

    #[test]
    fn test_carried_limit() {
        let p = policy("100", true);
        assert_eq!(carried_limit(&p, None, amount("50")), amount("50"));
        assert_eq!(carried_limit(&p, Some(amount("80")), amount("50")), amount("30"));
        assert_eq!(carried_limit(&p, Some(amount("80")), amount("120")), amount("-40"));
    }

    #[test]
    fn test_months_in_range() {
        let months = months_in_range(month("2024.1"), Some(month("2024.3"))).unwrap();
        assert_eq!(months, vec![month("2024.1"), month("2024.2"), month("2024.3")]);
    }

    #[test]
    fn test_months_in_range_crosses_year() {
        let months = months_in_range(month("2024.11"), Some(month("2025.2"))).unwrap();
        let keys: Vec<String> = months.iter().map(Month::key).collect();
        assert_eq!(keys, vec!["2024.11", "2024.12", "2025.1", "2025.2"]);
    }

    #[test]
    fn test_months_in_range_without_end() {
        assert_eq!(
            months_in_range(month("2024.7"), None).unwrap(),
            vec![month("2024.7")]
        );
    }

    #[test]
    fn test_months_in_range_rejects_equal_and_reversed() {
        for (start, end) in [("2024.1", "2024.1"), ("2024.3", "2024.1"), ("2025.1", "2024.12")] {
            let err = months_in_range(month(start), Some(month(end))).unwrap_err();
            assert_eq!(err.error_type(), ErrorType::InvalidRange, "{start}..{end}");
        }
    }

    /// Stores `amount` of spending on `date` without running the roll-over check.
    async fn spend(env: &TestEnv, category_id: i64, amount_str: &str, date: (i32, u32, u32)) {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        let new = NewSpending::new(category_id, amount(amount_str), date).unwrap();
        let mut conn = env.config().db().acquire().await.unwrap();
        queries::insert_spending(&mut conn, &new).await.unwrap();
    }

    async fn stored_limit(env: &TestEnv, m: &str) -> Option<Amount> {
        let mut conn = env.config().db().acquire().await.unwrap();
        queries::month_limit(&mut conn, month(m)).await.unwrap()
    }

    #[tokio::test]
    async fn test_resolve_limit_default_and_override() {
        let env = TestEnv::new().await;
        let p = policy("100", false);
        let mut conn = env.config().db().acquire().await.unwrap();
        assert_eq!(
            resolve_limit(&mut conn, &p, month("2024.5")).await.unwrap(),
            amount("100")
        );
        queries::put_month_limit(&mut conn, month("2024.5"), amount("250"))
            .await
            .unwrap();
        assert_eq!(
            resolve_limit(&mut conn, &p, month("2024.5")).await.unwrap(),
            amount("250")
        );
        // Other months are unaffected.
        assert_eq!(
            resolve_limit(&mut conn, &p, month("2024.6")).await.unwrap(),
            amount("100")
        );
    }

    #[tokio::test]
    async fn test_rollover_within_limit_writes_nothing() {
        let env = TestEnv::new().await;
        let food = env.insert_category("Food").await;
        spend(&env, food, "60", (2024, 5, 1)).await;
        spend(&env, food, "40", (2024, 5, 2)).await;

        let p = policy("100", true);
        let mut conn = env.config().db().acquire().await.unwrap();
        let outcome = rollover(&mut conn, &p, month("2024.5")).await.unwrap();
        assert_eq!(
            outcome,
            Rollover::WithinLimit {
                month: month("2024.5"),
                total: amount("100"),
                limit: amount("100"),
            }
        );
        drop(conn);
        assert_eq!(stored_limit(&env, "2024.5").await, None);
        assert_eq!(stored_limit(&env, "2024.6").await, None);
    }

    #[tokio::test]
    async fn test_rollover_creates_next_month_limit() {
        let env = TestEnv::new().await;
        let food = env.insert_category("Food").await;
        spend(&env, food, "150", (2024, 5, 10)).await;

        let p = policy("100", true);
        let mut conn = env.config().db().acquire().await.unwrap();
        let outcome = rollover(&mut conn, &p, month("2024.5")).await.unwrap();
        assert_eq!(
            outcome,
            Rollover::Carried {
                from: month("2024.5"),
                to: month("2024.6"),
                total: amount("150"),
                limit: amount("100"),
                overflow: amount("50"),
                next_limit: amount("50"),
            }
        );
        drop(conn);
        assert_eq!(stored_limit(&env, "2024.6").await, Some(amount("50")));
        assert_eq!(stored_limit(&env, "2024.5").await, None);
    }

    #[tokio::test]
    async fn test_rollover_decrements_existing_limit_below_zero() {
        let env = TestEnv::new().await;
        let food = env.insert_category("Food").await;
        env.set_limit("2024.6", "80").await;
        spend(&env, food, "220", (2024, 5, 10)).await;

        let p = policy("100", true);
        let mut conn = env.config().db().acquire().await.unwrap();
        rollover(&mut conn, &p, month("2024.5")).await.unwrap();
        drop(conn);
        assert_eq!(stored_limit(&env, "2024.6").await, Some(amount("-40")));
    }

    #[tokio::test]
    async fn test_rollover_uses_month_override_as_limit() {
        let env = TestEnv::new().await;
        let food = env.insert_category("Food").await;
        env.set_limit("2024.5", "200").await;
        env.set_limit("2024.6", "80").await;
        spend(&env, food, "250", (2024, 5, 10)).await;

        let p = policy("100", true);
        let mut conn = env.config().db().acquire().await.unwrap();
        let outcome = rollover(&mut conn, &p, month("2024.5")).await.unwrap();
        drop(conn);
        assert!(matches!(outcome, Rollover::Carried { overflow, .. } if overflow == amount("50")));
        assert_eq!(stored_limit(&env, "2024.6").await, Some(amount("30")));
    }

    #[tokio::test]
    async fn test_rollover_december_targets_january() {
        let env = TestEnv::new().await;
        let food = env.insert_category("Food").await;
        spend(&env, food, "130", (2024, 12, 31)).await;

        let p = policy("100", true);
        let mut conn = env.config().db().acquire().await.unwrap();
        rollover(&mut conn, &p, month("2024.12")).await.unwrap();
        drop(conn);
        assert_eq!(stored_limit(&env, "2025.1").await, Some(amount("70")));
    }

    #[tokio::test]
    async fn test_rollover_does_not_cascade() {
        let env = TestEnv::new().await;
        let food = env.insert_category("Food").await;
        // June already has spending over what its limit will become.
        spend(&env, food, "90", (2024, 6, 1)).await;
        spend(&env, food, "150", (2024, 5, 1)).await;

        let p = policy("100", true);
        let mut conn = env.config().db().acquire().await.unwrap();
        rollover(&mut conn, &p, month("2024.5")).await.unwrap();
        drop(conn);
        assert_eq!(stored_limit(&env, "2024.6").await, Some(amount("50")));
        assert_eq!(stored_limit(&env, "2024.7").await, None);
    }

    #[tokio::test]
    async fn test_rollover_fixed_mode_writes_nothing() {
        let env = TestEnv::new().await;
        let food = env.insert_category("Food").await;
        spend(&env, food, "150", (2024, 5, 10)).await;

        let p = policy("100", false);
        let mut conn = env.config().db().acquire().await.unwrap();
        let outcome = rollover(&mut conn, &p, month("2024.5")).await.unwrap();
        drop(conn);
        assert_eq!(
            outcome,
            Rollover::RaiseRequired {
                month: month("2024.5"),
                total: amount("150"),
                limit: amount("100"),
                overflow: amount("50"),
            }
        );
        assert_eq!(stored_limit(&env, "2024.5").await, None);
        assert_eq!(stored_limit(&env, "2024.6").await, None);
    }

    #[test]
    fn test_rollover_serializes_with_outcome_tag() {
        let r = Rollover::RaiseRequired {
            month: month("2024.5"),
            total: amount("150"),
            limit: amount("100"),
            overflow: amount("50"),
        };
        let json = serde_json::to_value(r).unwrap();
        assert_eq!(json["outcome"], "raise_required");
        assert_eq!(json["month"], "2024.5");
        assert_eq!(json["overflow"], "50.00");
    }
}
