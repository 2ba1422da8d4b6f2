//! Rotating copies of the SQLite file, taken before destructive operations such as `reset`.

use crate::error::Res;
use crate::{utils, Config};
use anyhow::Context;
use chrono::Local;
use std::path::PathBuf;

/// Prefix for SQLite backup files.
pub const SQLITE: &str = "spend.sqlite";

/// Manages backup file creation and rotation.
///
/// The `Backup` struct is immutable and owns copies of the paths and settings it needs.
/// Create a new instance via `Config::backup()` or `Backup::new()`.
#[derive(Debug, Clone)]
pub struct Backup {
    backups_dir: PathBuf,
    backup_copies: u32,
    sqlite_path: PathBuf,
}

impl Backup {
    pub fn new(config: &Config) -> Self {
        Self {
            backups_dir: config.backups().to_path_buf(),
            backup_copies: config.backup_copies(),
            sqlite_path: config.sqlite_path().to_path_buf(),
        }
    }

    /// Copies the SQLite database file to the backups directory.
    ///
    /// The filename format is `spend.sqlite.YYYY-MM-DD-NNN`. Old backups are rotated so that only
    /// `backup_copies` files are kept.
    ///
    /// Returns the path to the created backup file.
    pub(crate) async fn copy_sqlite(&self) -> Res<PathBuf> {
        let date = today();
        let seq = self.next_sequence_number(SQLITE, &date).await?;
        let filename = format!("{SQLITE}.{date}-{seq:03}");
        let path = self.backups_dir.join(&filename);

        utils::copy(&self.sqlite_path, &path).await?;

        self.rotate(SQLITE).await?;

        Ok(path)
    }

    /// Scans the backups directory for existing files with the given prefix and date,
    /// and returns the next sequence number.
    async fn next_sequence_number(&self, prefix: &str, date: &str) -> Res<u32> {
        let mut max_seq: u32 = 0;

        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if let Some(seq) = parse_sequence_number(&name, prefix, date) {
                max_seq = max_seq.max(seq);
            }
        }

        Ok(max_seq + 1)
    }

    /// Deletes the oldest files with the given prefix until `backup_copies` remain.
    async fn rotate(&self, prefix: &str) -> Res<()> {
        let mut files: Vec<(PathBuf, String)> = Vec::new();

        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if is_backup_file(&name, prefix) {
                files.push((entry.path(), name));
            }
        }

        // The name format sorts by date and then sequence number.
        files.sort_by(|a, b| a.1.cmp(&b.1));

        let to_delete = files.len().saturating_sub(self.backup_copies as usize);
        for (path, _) in files.into_iter().take(to_delete) {
            utils::remove(&path).await?;
        }

        Ok(())
    }
}

/// Returns today's date in YYYY-MM-DD format.
fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Parses the sequence number from a backup filename of the form `{prefix}.{date}-{NNN}`.
fn parse_sequence_number(filename: &str, prefix: &str, date: &str) -> Option<u32> {
    filename
        .strip_prefix(&format!("{prefix}.{date}-"))?
        .parse()
        .ok()
}

fn is_backup_file(filename: &str, prefix: &str) -> bool {
    match filename.strip_prefix(&format!("{prefix}.")) {
        Some(rest) => rest.len() == "YYYY-MM-DD-NNN".len() && rest.bytes().nth(10) == Some(b'-'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[test]
    fn test_parse_sequence_number() {
        assert_eq!(
            parse_sequence_number("spend.sqlite.2025-12-14-003", SQLITE, "2025-12-14"),
            Some(3)
        );
        assert_eq!(
            parse_sequence_number("spend.sqlite.2025-12-14-042", SQLITE, "2025-12-14"),
            Some(42)
        );
        // Wrong date
        assert_eq!(
            parse_sequence_number("spend.sqlite.2025-12-13-001", SQLITE, "2025-12-14"),
            None
        );
        assert_eq!(
            parse_sequence_number("spend.sqlite.2025-12-14-abc", SQLITE, "2025-12-14"),
            None
        );
    }

    #[test]
    fn test_is_backup_file() {
        assert!(is_backup_file("spend.sqlite.2025-12-14-001", SQLITE));
        assert!(!is_backup_file("spend.sqlite-journal", SQLITE));
        assert!(!is_backup_file("other.sqlite.2025-12-14-001", SQLITE));
        assert!(!is_backup_file("spend.sqlite.2025-12-14-001.json", SQLITE));
    }

    #[tokio::test]
    async fn test_copy_sqlite_rotates() {
        let env = TestEnv::new().await;
        let config = env.config();
        let backup = config.backup();
        let copies = config.backup_copies() as usize;

        let mut paths = Vec::new();
        for _ in 0..copies + 2 {
            paths.push(backup.copy_sqlite().await.unwrap());
        }

        let mut count = 0;
        let mut dir = utils::read_dir(config.backups()).await.unwrap();
        while let Some(entry) = dir.next_entry().await.unwrap() {
            assert!(is_backup_file(&entry.file_name().to_string_lossy(), SQLITE));
            count += 1;
        }
        assert_eq!(count, copies);
        // The two oldest were deleted and the newest remains.
        assert!(!paths[0].exists());
        assert!(!paths[1].exists());
        assert!(paths.last().unwrap().is_file());
    }
}
