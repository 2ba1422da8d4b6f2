use crate::args::MonthArgs;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::{Month, MonthDetail, MonthSummary, Overview};
use crate::{Config, Result};

/// Spending against the resolved limit for every month that has spending, oldest first.
pub async fn report(config: &Config) -> Result<Out<Overview>> {
    let overview = config
        .db()
        .overview(&config.policy())
        .await
        .pub_result(ErrorType::Persistence)?;
    Ok(Out::new(overview.to_string(), overview))
}

/// Per-day, per-category totals of a single month, along with its limit and total.
pub async fn month_detail(config: &Config, args: MonthArgs) -> Result<Out<MonthDetail>> {
    let detail = config
        .db()
        .month_detail(&config.policy(), args.month)
        .await
        .pub_result(ErrorType::Persistence)?;
    Ok(Out::new(detail.to_string(), detail))
}

/// The current month's spending and limit.
pub async fn status(config: &Config) -> Result<Out<MonthSummary>> {
    let summary = config
        .db()
        .summary(&config.policy(), Month::current()?)
        .await
        .pub_result(ErrorType::Persistence)?;
    let over = if summary.is_over() { " (over limit)" } else { "" };
    Ok(Out::new(
        format!(
            "{}: spent {} of {}, {} remaining{over}",
            summary.month,
            summary.spent,
            summary.limit,
            summary.remaining()
        ),
        summary,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::AddSpendingArgs;
    use crate::commands::add_spending;
    use crate::model::Amount;
    use crate::test::TestEnv;
    use chrono::{Local, NaiveDate};

    async fn spend(config: &Config, a: i64, date: NaiveDate) {
        let args = AddSpendingArgs {
            category: "Food".to_string(),
            amount: Amount::from_cents(a),
            date: Some(date),
        };
        add_spending(config, args).await.unwrap();
    }

    #[tokio::test]
    async fn test_report_shows_carried_limit() {
        let env = TestEnv::with_policy("100", true).await;
        env.insert_category("Food").await;
        let config = env.config();
        spend(&config, 15000, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()).await;
        spend(&config, 1000, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()).await;

        let out = report(&config).await.unwrap();
        let months = &out.structure().unwrap().months;
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].limit, Amount::from_cents(10000));
        assert!(months[0].is_over());
        assert_eq!(months[1].limit, Amount::from_cents(5000));
        assert_eq!(months[1].remaining(), Amount::from_cents(4000));
    }

    #[tokio::test]
    async fn test_month_detail_for_empty_month() {
        let env = TestEnv::new().await;
        env.insert_category("Food").await;
        let args = MonthArgs {
            month: Month::new(2023, 2).unwrap(),
        };
        let out = month_detail(&env.config(), args).await.unwrap();
        let detail = out.structure().unwrap();
        assert_eq!(detail.days.len(), 28);
        assert_eq!(detail.categories, vec!["Food"]);
        assert_eq!(detail.summary.spent, Amount::ZERO);
    }

    #[tokio::test]
    async fn test_status_is_current_month() {
        let env = TestEnv::new().await;
        env.insert_category("Food").await;
        let config = env.config();
        spend(&config, 250, Local::now().date_naive()).await;
        let out = status(&config).await.unwrap();
        let summary = out.structure().unwrap();
        assert_eq!(summary.month, Month::current().unwrap());
        assert_eq!(summary.spent, Amount::from_cents(250));
    }
}
