use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::PathBuf;
use tracing::info;

/// Deletes all categories, spending and limits. The settings in `config.json` are kept.
///
/// A copy of the database is written to the backups directory first, and nothing is deleted if
/// that copy fails. Returns the path of the backup.
pub async fn reset(config: &Config) -> Result<Out<PathBuf>> {
    let backup = config
        .backup()
        .copy_sqlite()
        .await
        .context("Unable to back up the database, nothing was deleted")
        .pub_result(ErrorType::Persistence)?;
    info!("Backed up the database to {}", backup.display());
    config
        .db()
        .reset()
        .await
        .pub_result(ErrorType::Persistence)?;
    Ok(Out::new(
        format!(
            "Deleted all data. The previous database was saved to {}",
            backup.display()
        ),
        backup,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_reset_backs_up_then_empties() {
        let env = TestEnv::new().await;
        env.insert_category("Food").await;
        let config = env.config();

        let out = reset(&config).await.unwrap();
        let backup = out.structure().unwrap();
        assert!(backup.is_file());
        assert!(backup.starts_with(config.backups()));
        assert!(config.db().categories().await.unwrap().is_empty());
    }
}
