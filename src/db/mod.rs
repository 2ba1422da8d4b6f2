//! This module is responsible for reading, writing and managing the SQLite database.

mod migrations;
pub(crate) mod queries;

use crate::error::Res;
use crate::limits::{self, LimitPolicy, Rollover};
use crate::model::{
    Amount, Category, DayRow, Month, MonthDetail, MonthSummary, NewSpending, Overview, Spending,
};
use anyhow::{bail, Context};
use migrations::CURRENT_VERSION;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const MAX_CONNECTIONS: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
}

/// The result of trying to set a month's limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LimitUpdate {
    Written,
    /// The limit was not written because it is below what has already been spent.
    BelowSpending { total: Amount },
}

impl Db {
    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Initializes the database schema
    pub(crate) async fn init(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A database already exists at '{}'", path.display());
        }
        let pool = connect(path, true).await?;
        sqlx::query("CREATE TABLE schema_version (version INTEGER NOT NULL)")
            .execute(&pool)
            .await
            .context("Failed to create the schema_version table")?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
            .execute(&pool)
            .await
            .context("Failed to seed the schema_version table")?;
        migrations::run(&pool, 0, CURRENT_VERSION).await?;
        debug!("Created database at {}", path.display());
        Ok(Self { pool })
    }

    /// - Validates that there is a SQLite file at `path`
    /// - Updates the database schema with migrations if it is out-of-date
    pub(crate) async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("The database file is missing '{}'", path.display());
        }
        let pool = connect(path, false).await?;
        let version = migrations::version(&pool).await?;
        if version > CURRENT_VERSION {
            bail!(
                "The database schema version {version} is newer than this program supports \
                ({CURRENT_VERSION})"
            );
        }
        migrations::run(&pool, version, CURRENT_VERSION).await?;
        Ok(Self { pool })
    }

    pub(crate) async fn acquire(&self) -> Res<PoolConnection<Sqlite>> {
        self.pool
            .acquire()
            .await
            .context("Failed to acquire a database connection")
    }

    /// Starts a transaction with `BEGIN IMMEDIATE`, which takes the write lock up front. A second
    /// writer waits on the busy timeout instead of failing on a lock upgrade.
    async fn begin_write(&self) -> Res<Transaction<'static, Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .context("Failed to begin a write transaction")
    }

    pub(crate) async fn insert_category(&self, name: &str) -> Res<Category> {
        let mut conn = self.acquire().await?;
        let id = queries::insert_category(&mut conn, name).await?;
        Ok(Category {
            id,
            name: name.to_string(),
        })
    }

    pub(crate) async fn category_by_name(&self, name: &str) -> Res<Option<Category>> {
        let mut conn = self.acquire().await?;
        queries::category_by_name(&mut conn, name).await
    }

    pub(crate) async fn categories(&self) -> Res<Vec<Category>> {
        let mut conn = self.acquire().await?;
        queries::categories(&mut conn).await
    }

    /// Stores `new` and runs the roll-over check for its month in a single transaction.
    ///
    /// The write lock is held from the start, so two concurrent entries for the same month cannot
    /// both read the total from before the other's insert. If any step fails, nothing is written.
    pub(crate) async fn record_spending(
        &self,
        policy: &LimitPolicy,
        new: NewSpending,
    ) -> Res<(Spending, Rollover)> {
        let month = new.month();
        let mut tx = self.begin_write().await?;
        let id = queries::insert_spending(&mut tx, &new).await?;
        let rollover = limits::rollover(&mut tx, policy, month).await?;
        tx.commit()
            .await
            .context("Failed to commit the spending entry")?;
        Ok((new.into_spending(id), rollover))
    }

    pub(crate) async fn spending_in_month(&self, month: Month) -> Res<Vec<Spending>> {
        let mut conn = self.acquire().await?;
        queries::spending_in_month(&mut conn, month).await
    }

    /// The month's total spending and its effective limit.
    pub(crate) async fn summary(&self, policy: &LimitPolicy, month: Month) -> Res<MonthSummary> {
        let mut conn = self.acquire().await?;
        let spent = queries::month_total(&mut conn, month).await?;
        let limit = limits::resolve_limit(&mut conn, policy, month).await?;
        Ok(MonthSummary {
            month,
            spent,
            limit,
        })
    }

    /// Writes an explicit limit for `month`, unless the month has already spent more than it.
    pub(crate) async fn set_limit(&self, month: Month, limit: Amount) -> Res<LimitUpdate> {
        let mut tx = self.begin_write().await?;
        let total = queries::month_total(&mut tx, month).await?;
        if limit < total {
            return Ok(LimitUpdate::BelowSpending { total });
        }
        queries::put_month_limit(&mut tx, month, limit).await?;
        tx.commit()
            .await
            .with_context(|| format!("Failed to commit the limit for {month}"))?;
        Ok(LimitUpdate::Written)
    }

    /// Writes the same explicit limit for every month in `months`. Either all are written or none.
    pub(crate) async fn set_limits(&self, months: &[Month], limit: Amount) -> Res<()> {
        let mut tx = self.begin_write().await?;
        for &month in months {
            queries::put_month_limit(&mut tx, month, limit).await?;
        }
        tx.commit()
            .await
            .context("Failed to commit the month limits")?;
        debug!("Set the limit of {} months to {limit}", months.len());
        Ok(())
    }

    /// A summary of every month that has spending, oldest first.
    pub(crate) async fn overview(&self, policy: &LimitPolicy) -> Res<Overview> {
        let mut conn = self.acquire().await?;
        let totals = queries::month_totals(&mut conn).await?;
        let mut months = Vec::with_capacity(totals.len());
        for (month, spent) in totals {
            let limit = limits::resolve_limit(&mut conn, policy, month).await?;
            months.push(MonthSummary {
                month,
                spent,
                limit,
            });
        }
        months.sort_by_key(|m| m.month);
        Ok(Overview { months })
    }

    /// A grid of every day of `month` against every category.
    pub(crate) async fn month_detail(&self, policy: &LimitPolicy, month: Month) -> Res<MonthDetail> {
        let mut conn = self.acquire().await?;
        let categories = queries::categories(&mut conn).await?;
        let totals = queries::daily_totals(&mut conn, month).await?;
        let spent = queries::month_total(&mut conn, month).await?;
        let limit = limits::resolve_limit(&mut conn, policy, month).await?;

        let column: HashMap<i64, usize> = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id, i))
            .collect();
        let mut days: Vec<DayRow> = month
            .days()
            .map(|date| DayRow {
                date,
                amounts: vec![Amount::ZERO; categories.len()],
            })
            .collect();
        for (date, category_id, amount) in totals {
            let row = days.iter_mut().find(|d| d.date == date);
            let col = column.get(&category_id);
            if let (Some(row), Some(&col)) = (row, col) {
                row.amounts[col] = amount;
            }
        }

        Ok(MonthDetail {
            summary: MonthSummary {
                month,
                spent,
                limit,
            },
            categories: categories.into_iter().map(|c| c.name).collect(),
            days,
        })
    }

    /// Deletes all data by migrating the schema down to nothing and back up again.
    pub(crate) async fn reset(&self) -> Res<()> {
        migrations::run(&self.pool, CURRENT_VERSION, 0).await?;
        migrations::run(&self.pool, 0, CURRENT_VERSION).await
    }
}

async fn connect(path: &Path, create: bool) -> Res<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);
    SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .with_context(|| format!("Unable to open the database at '{}'", path.display()))
}
