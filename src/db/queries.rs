//! Single SQL statements. Each function takes a connection so that it can run either on its own
//! or as one step of a larger transaction.

use crate::error::Res;
use crate::model::{Amount, Category, Month, NewSpending, Spending};
use anyhow::Context;
use chrono::NaiveDate;
use sqlx::SqliteConnection;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) async fn insert_category(conn: &mut SqliteConnection, name: &str) -> Res<i64> {
    let result = sqlx::query("INSERT INTO categories (name) VALUES (?)")
        .bind(name)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to insert category '{name}'"))?;
    Ok(result.last_insert_rowid())
}

pub(crate) async fn category_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Res<Option<Category>> {
    let row: Option<(i64, String)> =
        sqlx::query_as("SELECT id, name FROM categories WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await
            .context("Failed to look up category")?;
    Ok(row.map(|(id, name)| Category { id, name }))
}

pub(crate) async fn categories(conn: &mut SqliteConnection) -> Res<Vec<Category>> {
    let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM categories ORDER BY name")
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list categories")?;
    Ok(rows
        .into_iter()
        .map(|(id, name)| Category { id, name })
        .collect())
}

pub(crate) async fn insert_spending(conn: &mut SqliteConnection, new: &NewSpending) -> Res<i64> {
    let result = sqlx::query(
        "INSERT INTO spending (category_id, amount_cents, date, month) VALUES (?, ?, ?, ?)",
    )
    .bind(new.category_id())
    .bind(new.amount().to_cents()?)
    .bind(new.date().format(DATE_FORMAT).to_string())
    .bind(new.month().key())
    .execute(&mut *conn)
    .await
    .context("Failed to insert spending")?;
    Ok(result.last_insert_rowid())
}

pub(crate) async fn spending_in_month(
    conn: &mut SqliteConnection,
    month: Month,
) -> Res<Vec<Spending>> {
    let rows: Vec<(i64, i64, String, i64, String)> = sqlx::query_as(
        "SELECT s.id, s.category_id, c.name, s.amount_cents, s.date \
         FROM spending s JOIN categories c ON c.id = s.category_id \
         WHERE s.month = ? ORDER BY s.date, s.id",
    )
    .bind(month.key())
    .fetch_all(&mut *conn)
    .await
    .with_context(|| format!("Failed to list spending for {month}"))?;

    rows.into_iter()
        .map(|(id, category_id, name, cents, date)| -> Res<Spending> {
            let date = parse_date(&date)?;
            Ok(Spending {
                id,
                category_id,
                category: Some(name),
                amount: Amount::from_cents(cents),
                date,
                month,
            })
        })
        .collect()
}

/// The sum of every spending amount in `month`. Always re-aggregated from the rows.
pub(crate) async fn month_total(conn: &mut SqliteConnection, month: Month) -> Res<Amount> {
    let cents: Option<i64> =
        sqlx::query_scalar("SELECT SUM(amount_cents) FROM spending WHERE month = ?")
            .bind(month.key())
            .fetch_one(&mut *conn)
            .await
            .with_context(|| format!("Failed to total spending for {month}"))?;
    Ok(Amount::from_cents(cents.unwrap_or_default()))
}

/// Totals per month, for every month that has spending.
pub(crate) async fn month_totals(conn: &mut SqliteConnection) -> Res<Vec<(Month, Amount)>> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT month, SUM(amount_cents) FROM spending GROUP BY month")
            .fetch_all(&mut *conn)
            .await
            .context("Failed to total spending by month")?;
    rows.into_iter()
        .map(|(key, cents)| -> Res<(Month, Amount)> {
            let month = key
                .parse::<Month>()
                .with_context(|| format!("Invalid month key '{key}' in the spending table"))?;
            Ok((month, Amount::from_cents(cents)))
        })
        .collect()
}

/// Totals per `(date, category_id)` within `month`.
pub(crate) async fn daily_totals(
    conn: &mut SqliteConnection,
    month: Month,
) -> Res<Vec<(NaiveDate, i64, Amount)>> {
    let rows: Vec<(String, i64, i64)> = sqlx::query_as(
        "SELECT date, category_id, SUM(amount_cents) FROM spending \
         WHERE month = ? GROUP BY date, category_id",
    )
    .bind(month.key())
    .fetch_all(&mut *conn)
    .await
    .with_context(|| format!("Failed to total daily spending for {month}"))?;
    rows.into_iter()
        .map(|(date, category_id, cents)| -> Res<(NaiveDate, i64, Amount)> {
            Ok((parse_date(&date)?, category_id, Amount::from_cents(cents)))
        })
        .collect()
}

/// The explicit limit for `month`, if one has been set.
pub(crate) async fn month_limit(conn: &mut SqliteConnection, month: Month) -> Res<Option<Amount>> {
    let cents: Option<i64> =
        sqlx::query_scalar("SELECT limit_cents FROM month_limits WHERE month = ?")
            .bind(month.key())
            .fetch_optional(&mut *conn)
            .await
            .with_context(|| format!("Failed to read the limit for {month}"))?;
    Ok(cents.map(Amount::from_cents))
}

/// Creates or replaces the explicit limit for `month`.
pub(crate) async fn put_month_limit(
    conn: &mut SqliteConnection,
    month: Month,
    limit: Amount,
) -> Res<()> {
    sqlx::query(
        "INSERT INTO month_limits (month, limit_cents) VALUES (?, ?) \
         ON CONFLICT (month) DO UPDATE SET limit_cents = excluded.limit_cents",
    )
    .bind(month.key())
    .bind(limit.to_cents()?)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Failed to write the limit for {month}"))?;
    Ok(())
}

fn parse_date(s: &str) -> Res<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .with_context(|| format!("Invalid date '{s}' in the spending table"))
}
