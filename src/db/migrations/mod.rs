//! Database schema migrations.
//!
//! Each schema version `NN` has a pair of SQL files in this directory:
//! - `migration_NN_up.sql` upgrades the schema from `NN-1` to `NN`
//! - `migration_NN_down.sql` downgrades it from `NN` back to `NN-1`
//!
//! The applied version is held in the single-row `schema_version` table, which is created outside
//! of the migrations when the database file is first initialized.

use anyhow::{bail, Context};
use sqlx::{Executor, SqlitePool};
use tracing::debug;

use crate::error::Res;

/// The schema version this build of the program expects.
pub(crate) const CURRENT_VERSION: i32 = 1;

struct Migration {
    version: i32,
    up_sql: &'static str,
    down_sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    up_sql: include_str!("migration_01_up.sql"),
    down_sql: include_str!("migration_01_down.sql"),
}];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

/// One SQL script to run, and the version the schema is at once it has run.
#[derive(Debug, Clone, Copy)]
struct Step {
    sql: &'static str,
    direction: Direction,
    resulting_version: i32,
}

/// Moves the schema from version `from` to version `to`, one version per transaction.
///
/// All required migrations are looked up before anything runs, so a missing migration leaves the
/// database untouched.
pub(crate) async fn run(pool: &SqlitePool, from: i32, to: i32) -> Res<()> {
    let steps = plan(from, to)?;
    if steps.is_empty() {
        debug!("Database already at schema version {to}");
        return Ok(());
    }
    for step in steps {
        debug!(
            "Migrating schema {:?} to version {:02}",
            step.direction, step.resulting_version
        );
        apply(pool, step).await?;
    }
    debug!("Migration complete, schema now at version {to}");
    Ok(())
}

/// Reads the applied schema version.
pub(crate) async fn version(pool: &SqlitePool) -> Res<i32> {
    let version: Option<i32> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .context("Failed to read the schema version")?;
    Ok(version.unwrap_or_default())
}

fn plan(from: i32, to: i32) -> Res<Vec<Step>> {
    let find = |version: i32| {
        MIGRATIONS
            .iter()
            .find(|m| m.version == version)
            .with_context(|| {
                format!("Migration {version} is required to go from version {from} to {to} but it does not exist")
            })
    };

    let mut steps = Vec::new();
    if from < to {
        for version in (from + 1)..=to {
            steps.push(Step {
                sql: find(version)?.up_sql,
                direction: Direction::Up,
                resulting_version: version,
            });
        }
    } else if from > to {
        for version in ((to + 1)..=from).rev() {
            steps.push(Step {
                sql: find(version)?.down_sql,
                direction: Direction::Down,
                resulting_version: version - 1,
            });
        }
    }
    Ok(steps)
}

async fn apply(pool: &SqlitePool, step: Step) -> Res<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin migration transaction")?;

    tx.execute(step.sql)
        .await
        .with_context(|| format!("Failed to migrate to version {}", step.resulting_version))?;

    sqlx::query("DELETE FROM schema_version")
        .execute(&mut *tx)
        .await
        .context("Failed to clear schema_version")?;
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(step.resulting_version)
        .execute(&mut *tx)
        .await
        .context("Failed to update schema_version")?;

    tx.commit()
        .await
        .context("Failed to commit migration transaction")
}
