//! SQLite-backed [`Store`] implementation.
//!
//! Every multi-row write goes through one `sqlx` transaction; if any
//! statement fails the transaction is dropped uncommitted and SQLite rolls
//! it back. Foreign keys are enforced by the connection options, so a
//! status row can only reference an existing run and partner.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{
    FileRunStatus, FileStatus, FilesetChange, FilesetEntry, Filetype, Partner, PartnerRunStatus,
    PartnerStatus, Run, RunId, RunOutcome,
};
use crate::store::Store;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn ts_to_datetime(ts: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0).ok_or_else(|| anyhow!("invalid timestamp {}", ts))
}

fn columns_to_json(columns: Option<&[String]>) -> Result<Option<String>> {
    columns
        .map(|c| serde_json::to_string(c).context("Failed to encode column list"))
        .transpose()
}

fn columns_from_json(raw: Option<String>) -> Result<Option<Vec<String>>> {
    raw.map(|s| {
        serde_json::from_str(&s).with_context(|| format!("Malformed column list: {}", s))
    })
    .transpose()
}

fn row_to_run(row: &SqliteRow) -> Result<Run> {
    Ok(Run {
        id: row.get("id"),
        started_at: ts_to_datetime(row.get("started_at"))?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn partners(&self) -> Result<Vec<Partner>> {
        let rows = sqlx::query(
            "SELECT id, name, full_name, directory, stored_directory, enabled FROM partners ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load partners")?;

        Ok(rows
            .iter()
            .map(|row| Partner {
                id: row.get("id"),
                name: row.get("name"),
                full_name: row.get("full_name"),
                directory: row.get::<String, _>("directory").into(),
                stored_directory: row
                    .get::<Option<String>, _>("stored_directory")
                    .map(Into::into),
                enabled: row.get("enabled"),
            })
            .collect())
    }

    async fn filetypes(&self) -> Result<Vec<Filetype>> {
        let rows = sqlx::query("SELECT id, name FROM filetypes ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to load filetypes")?;

        Ok(rows
            .iter()
            .map(|row| Filetype {
                id: row.get("id"),
                name: row.get("name"),
            })
            .collect())
    }

    async fn fileset_entries(&self) -> Result<Vec<FilesetEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT partner_id, filename_pattern, filetype_id, header, recorded_at
            FROM fileset_entries
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load fileset entries")?;

        rows.iter()
            .map(|row| {
                Ok(FilesetEntry {
                    partner_id: row.get("partner_id"),
                    filename_pattern: row.get("filename_pattern"),
                    filetype_id: row.get("filetype_id"),
                    header: row.get("header"),
                    recorded_at: ts_to_datetime(row.get("recorded_at"))?,
                })
            })
            .collect()
    }

    async fn begin_run(&self, started_at: DateTime<Utc>) -> Result<Run> {
        let mut tx = self.pool.begin().await?;

        let last: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM runs")
            .fetch_one(&mut *tx)
            .await?;
        let run = Run {
            id: last + 1,
            started_at,
        };

        sqlx::query("INSERT INTO runs (id, started_at) VALUES (?, ?)")
            .bind(run.id)
            .bind(run.started_at.timestamp())
            .execute(&mut *tx)
            .await?;

        tx.commit().await.context("Failed to record new run")?;
        Ok(run)
    }

    async fn record_run(&self, run_id: RunId, outcome: &RunOutcome) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for p in &outcome.partners {
            sqlx::query("INSERT INTO partner_run_status (run_id, partner_id, code) VALUES (?, ?, ?)")
                .bind(run_id)
                .bind(p.partner_id)
                .bind(p.status.code())
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to record status of partner {}", p.partner_id))?;
        }

        for f in &outcome.files {
            sqlx::query(
                r#"
                INSERT INTO file_run_status
                    (run_id, partner_id, filename_pattern, filetype_id, code,
                     columns_added, columns_removed)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(run_id)
            .bind(f.partner_id)
            .bind(&f.filename)
            .bind(f.filetype_id)
            .bind(f.status.code())
            .bind(columns_to_json(f.status.added())?)
            .bind(columns_to_json(f.status.removed())?)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to record status of file {}", f.filename))?;
        }

        tx.commit()
            .await
            .with_context(|| format!("Failed to commit run {}", run_id))?;
        Ok(())
    }

    async fn run(&self, run_id: RunId) -> Result<Option<Run>> {
        let row = sqlx::query("SELECT id, started_at FROM runs WHERE id = ?")
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_run).transpose()
    }

    async fn partner_statuses(&self, run_id: RunId) -> Result<Vec<PartnerRunStatus>> {
        let rows = sqlx::query(
            "SELECT run_id, partner_id, code FROM partner_run_status WHERE run_id = ? ORDER BY id",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(PartnerRunStatus {
                    run_id: row.get("run_id"),
                    partner_id: row.get("partner_id"),
                    status: PartnerStatus::from_code(row.get("code"))?,
                })
            })
            .collect()
    }

    async fn file_statuses(&self, run_id: RunId) -> Result<Vec<FileRunStatus>> {
        let rows = sqlx::query(
            r#"
            SELECT run_id, partner_id, filename_pattern, filetype_id, code,
                   columns_added, columns_removed
            FROM file_run_status
            WHERE run_id = ?
            ORDER BY id
            "#,
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let status = FileStatus::from_parts(
                    row.get("code"),
                    columns_from_json(row.get("columns_added"))?,
                    columns_from_json(row.get("columns_removed"))?,
                )?;
                Ok(FileRunStatus {
                    run_id: row.get("run_id"),
                    partner_id: row.get("partner_id"),
                    filename: row.get("filename_pattern"),
                    filetype_id: row.get("filetype_id"),
                    status,
                })
            })
            .collect()
    }

    async fn apply_fileset_changes(&self, changes: &[FilesetChange]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for change in changes {
            let entry = change.entry();
            if let FilesetChange::Replace(_) = change {
                sqlx::query("DELETE FROM fileset_entries WHERE partner_id = ? AND filetype_id IS ?")
                    .bind(entry.partner_id)
                    .bind(entry.filetype_id)
                    .execute(&mut *tx)
                    .await?;
            }
            sqlx::query("DELETE FROM fileset_entries WHERE partner_id = ? AND filename_pattern = ?")
                .bind(entry.partner_id)
                .bind(&entry.filename_pattern)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                r#"
                INSERT INTO fileset_entries
                    (partner_id, filename_pattern, filetype_id, header, recorded_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(entry.partner_id)
            .bind(&entry.filename_pattern)
            .bind(entry.filetype_id)
            .bind(&entry.header)
            .bind(entry.recorded_at.timestamp())
            .execute(&mut *tx)
            .await
            .with_context(|| {
                format!(
                    "Failed to record fileset entry {} for partner {}",
                    entry.filename_pattern, entry.partner_id
                )
            })?;
        }

        tx.commit().await.context("Failed to commit fileset changes")?;
        Ok(())
    }
}
