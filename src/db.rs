use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::config::Config;

pub async fn connect(config: &Config) -> Result<SqlitePool> {
    connect_path(&config.db.path).await
}

pub async fn connect_path(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    // A single writer: all of a run's statements share one connection.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

    Ok(pool)
}

/// Copy the database to `<path>.bk` if it exists. Returns the backup path
/// when a copy was made.
pub fn backup_database(db_path: &Path) -> Result<Option<PathBuf>> {
    if !db_path.is_file() {
        return Ok(None);
    }
    let mut backup = db_path.as_os_str().to_owned();
    backup.push(".bk");
    let backup = PathBuf::from(backup);

    info!(from = %db_path.display(), to = %backup.display(), "backing up database");
    std::fs::copy(db_path, &backup)
        .with_context(|| format!("Failed to back up database to {}", backup.display()))?;
    Ok(Some(backup))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_backup_skipped_when_db_missing() {
        let tmp = TempDir::new().unwrap();
        assert!(backup_database(&tmp.path().join("fileset.sqlite"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_backup_copies_db() {
        let tmp = TempDir::new().unwrap();
        let db = tmp.path().join("fileset.sqlite");
        std::fs::write(&db, b"sqlite bytes").unwrap();
        let backup = backup_database(&db).unwrap().unwrap();
        assert_eq!(backup, tmp.path().join("fileset.sqlite.bk"));
        assert_eq!(std::fs::read(&backup).unwrap(), b"sqlite bytes");
    }
}
