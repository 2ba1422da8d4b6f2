use crate::args::InitArgs;
use crate::commands::Out;
use crate::config::DEFAULT_LIMIT;
use crate::error::{ErrorType, IntoResult};
use crate::limits::LimitPolicy;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory, its subdirectories, an initial `config.json` and an empty
/// database.
///
/// # Arguments
/// - `spend_home` - The directory that will be the root of the data directory, e.g. `$HOME/spend`
/// - `args` - The default limit (1000.00 when omitted) and whether adaptive mode is on
///
/// # Errors
/// - Returns an error if the directory has already been initialized.
/// - Returns an error if any file operations fail.
pub async fn init(spend_home: &Path, args: &InitArgs) -> Result<Out<LimitPolicy>> {
    let default_limit = args.default_limit.unwrap_or(DEFAULT_LIMIT).validated()?;
    let policy = LimitPolicy::new(default_limit, args.adaptive);
    let config = Config::create(spend_home, policy)
        .await
        .context("Unable to create the data directory and configs")
        .pub_result(ErrorType::Config)?;
    Ok(Out::new(
        format!(
            "Successfully created the spend directory at {}",
            config.root().display()
        ),
        config.policy(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Amount;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_defaults() {
        let dir = TempDir::new().unwrap();
        let args = InitArgs {
            default_limit: None,
            adaptive: false,
        };
        let out = init(dir.path(), &args).await.unwrap();
        let policy = out.structure().unwrap();
        assert_eq!(policy.default_limit, DEFAULT_LIMIT);
        assert!(!policy.adaptive_limit);
        assert!(Config::load(dir.path()).await.is_ok());
    }

    #[tokio::test]
    async fn test_init_twice_is_config_error() {
        let dir = TempDir::new().unwrap();
        let args = InitArgs {
            default_limit: Some(Amount::from_cents(5000)),
            adaptive: true,
        };
        init(dir.path(), &args).await.unwrap();
        let err = init(dir.path(), &args).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
    }
}
