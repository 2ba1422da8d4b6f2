//! Configuration file handling.
//!
//! The configuration file is stored at `$SPEND_HOME/config.json` and holds the limit policy (the
//! default monthly limit and whether overspend rolls over) along with backup settings.

use crate::backup::Backup;
use crate::db::Db;
use crate::error::{ErrorType, IntoResult, Res};
use crate::limits::LimitPolicy;
use crate::model::Amount;
use crate::{utils, Result};
use anyhow::{bail, Context};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_NAME: &str = "spend";
const CONFIG_VERSION: u8 = 1;
const BACKUP_COPIES: u32 = 5;
const BACKUPS: &str = ".backups";
const CONFIG_JSON: &str = "config.json";
const SPEND_SQLITE: &str = "spend.sqlite";

/// The default monthly limit written by `init` when none is given.
pub const DEFAULT_LIMIT: Amount = Amount::new(Decimal::from_parts(100000, 0, 0, false, 2));

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$SPEND_HOME` and from there it loads `$SPEND_HOME/config.json`. It provides paths
/// to the other items that are expected in a certain location within the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    backups: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    db: Db,
    sqlite_path: PathBuf,
}

impl Config {
    /// Creates the data directory, its subdirectories, an initial `config.json` holding `policy`,
    /// and an empty database.
    ///
    /// # Errors
    /// - Returns an error if a config file or database already exists in `dir`.
    /// - Returns an error if any file operations fail.
    pub(crate) async fn create(dir: impl Into<PathBuf>, policy: LimitPolicy) -> Res<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the spend home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            bail!(
                "A config file already exists at '{}'",
                config_path.display()
            );
        }

        let backups = root.join(BACKUPS);
        utils::make_dir(&backups).await?;

        let sqlite_path = root.join(SPEND_SQLITE);
        let db = Db::init(&sqlite_path)
            .await
            .context("Unable to create SQLite DB")?;

        let config_file = ConfigFile::new(policy, BACKUP_COPIES);
        config_file.save(&config_path).await?;
        debug!("Created {}", config_path.display());

        Ok(Self {
            root,
            backups,
            config_path,
            config_file,
            db,
            sqlite_path,
        })
    }

    /// This will
    /// - validate that `spend_home` exists and that the config file exists
    /// - load the config file
    /// - validate that the backups directory exists
    /// - load the database, migrating it if needed
    pub(crate) async fn load(spend_home: impl Into<PathBuf>) -> Res<Self> {
        let maybe_relative = spend_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The spend home directory is missing, run 'spend init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let backups = root.join(BACKUPS);
        if !backups.is_dir() {
            bail!("The backups directory is missing '{}'", backups.display())
        }

        let sqlite_path = root.join(SPEND_SQLITE);
        let db = Db::load(&sqlite_path)
            .await
            .context("Unable to load SQLite DB")?;

        Ok(Self {
            root,
            backups,
            config_path,
            config_file,
            db,
            sqlite_path,
        })
    }

    /// Loads the configuration and database of an initialized spend home for a command.
    ///
    /// # Errors
    /// - `ErrorType::Config` if the home directory, config file or database cannot be loaded.
    pub async fn open(spend_home: impl Into<PathBuf>) -> Result<Self> {
        Self::load(spend_home).await.pub_result(ErrorType::Config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub(crate) fn db(&self) -> &Db {
        &self.db
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    pub fn backup_copies(&self) -> u32 {
        self.config_file.backup_copies
    }

    /// The limit settings that every limit and roll-over decision is made with.
    pub fn policy(&self) -> LimitPolicy {
        LimitPolicy {
            default_limit: self.config_file.default_limit,
            adaptive_limit: self.config_file.adaptive_limit,
        }
    }

    /// Replaces the limit policy and rewrites `config.json`. The in-memory value only changes once
    /// the file has been written.
    pub(crate) async fn update_policy(&mut self, policy: LimitPolicy) -> Res<()> {
        let mut config_file = self.config_file.clone();
        config_file.default_limit = policy.default_limit.round();
        config_file.adaptive_limit = policy.adaptive_limit;
        config_file.save(&self.config_path).await?;
        self.config_file = config_file;
        Ok(())
    }

    /// Creates a new `Backup` instance for managing backup files.
    pub fn backup(&self) -> Backup {
        Backup::new(self)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "spend",
///   "config_version": 1,
///   "default_limit": 1000.0,
///   "adaptive_limit": false,
///   "backup_copies": 5
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "spend"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// The limit of every month without an explicit limit
    #[serde(with = "amount_as_number")]
    default_limit: Amount,

    /// Whether overspend is subtracted from the following month's limit
    #[serde(default)]
    adaptive_limit: bool,

    /// Number of backup copies to keep
    #[serde(default = "default_backup_copies")]
    backup_copies: u32,
}

fn default_backup_copies() -> u32 {
    BACKUP_COPIES
}

impl ConfigFile {
    fn new(policy: LimitPolicy, backup_copies: u32) -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            default_limit: policy.default_limit.round(),
            adaptive_limit: policy.adaptive_limit,
            backup_copies,
        }
    }

    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if it belongs to another app.
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let content = utils::read(path).await?;

        let mut config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        config.default_limit = config
            .default_limit
            .round()
            .storable()
            .with_context(|| format!("Invalid default_limit in {}", path.display()))?;
        Ok(config)
    }

    /// Saves the ConfigFile to the specified path, replacing any existing file.
    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }
}

/// Writes the default limit as a JSON number, which is how people write it by hand.
mod amount_as_number {
    use crate::model::Amount;
    use rust_decimal::Decimal;
    use serde::{Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&value.value(), serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let value: Decimal = rust_decimal::serde::float::deserialize(deserializer)?;
        Ok(Amount::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn amount(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    #[test]
    fn test_default_limit_constant() {
        assert_eq!(DEFAULT_LIMIT, amount("1000.00"));
    }

    #[tokio::test]
    async fn test_config_create() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("spend_home");
        let policy = LimitPolicy::new(amount("250"), true);

        let config = Config::create(&home_dir, policy).await.unwrap();

        assert_eq!(config.policy(), policy);
        assert_eq!(config.backup_copies(), BACKUP_COPIES);
        assert!(config.backups().is_dir());
        assert!(config.sqlite_path().is_file());
        assert!(config.config_path().is_file());
    }

    #[tokio::test]
    async fn test_config_create_twice_fails() {
        let dir = TempDir::new().unwrap();
        let policy = LimitPolicy::new(DEFAULT_LIMIT, false);
        Config::create(dir.path(), policy).await.unwrap();
        let err = Config::create(dir.path(), policy).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_config_load() {
        let dir = TempDir::new().unwrap();
        let policy = LimitPolicy::new(amount("42.5"), false);
        Config::create(dir.path(), policy).await.unwrap();

        let loaded = Config::load(dir.path()).await.unwrap();
        assert_eq!(loaded.policy(), policy);
    }

    #[tokio::test]
    async fn test_config_load_missing_home() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load(dir.path().join("nope")).await.is_err());
    }

    #[tokio::test]
    async fn test_update_policy_persists() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::create(dir.path(), LimitPolicy::new(DEFAULT_LIMIT, false))
            .await
            .unwrap();

        let updated = LimitPolicy::new(amount("300.126"), true);
        config.update_policy(updated).await.unwrap();
        assert_eq!(config.policy().default_limit, amount("300.13"));
        assert!(config.policy().adaptive_limit);

        let reloaded = Config::load(dir.path()).await.unwrap();
        assert_eq!(reloaded.policy(), config.policy());
    }

    #[tokio::test]
    async fn test_config_file_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let original = ConfigFile::new(LimitPolicy::new(amount("99.99"), true), 7);
        original.save(&config_path).await.unwrap();
        let loaded = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(original, loaded);
    }

    #[test]
    fn test_config_file_writes_limit_as_number() {
        let config = ConfigFile::new(LimitPolicy::new(amount("1000"), false), 5);
        let json = serde_json::to_value(&config).unwrap();
        assert!(json["default_limit"].is_number());
        assert_eq!(json["default_limit"].as_f64(), Some(1000.0));
    }

    #[tokio::test]
    async fn test_config_file_load_with_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "spend",
            "config_version": 1,
            "default_limit": 500.5
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let config = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(config.default_limit, amount("500.50"));
        assert!(!config.adaptive_limit);
        assert_eq!(config.backup_copies, BACKUP_COPIES);
    }

    #[tokio::test]
    async fn test_config_file_load_default_limit_too_large() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "spend",
            "config_version": 1,
            "default_limit": -1e20
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let result = ConfigFile::load(&config_path).await;
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Invalid default_limit"));
    }

    #[tokio::test]
    async fn test_config_file_load_invalid_app_name() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "wrong_app",
            "config_version": 1,
            "default_limit": 100
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let result = ConfigFile::load(&config_path).await;
        assert!(result.unwrap_err().to_string().contains("Invalid app_name"));
    }
}
