//! Schema creation and seed-data loading (`data-inbox --create`).
//!
//! Creation is idempotent: every table uses `IF NOT EXISTS`, and an
//! "already exists" error from SQLite is downgraded to a warning so a
//! repeated `--create` never aborts.

use std::path::Path;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::config::Config;
use crate::confirm::Confirm;
use crate::db;
use crate::models::{FileStatus, PartnerStatus};

const SCHEMA: &[(&str, &str)] = &[
    (
        "partners",
        r#"
        CREATE TABLE IF NOT EXISTS partners (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            full_name TEXT NOT NULL,
            directory TEXT NOT NULL,
            stored_directory TEXT,
            enabled INTEGER NOT NULL DEFAULT 1
        )
        "#,
    ),
    (
        "filetypes",
        r#"
        CREATE TABLE IF NOT EXISTS filetypes (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    ),
    (
        "fileset_entries",
        r#"
        CREATE TABLE IF NOT EXISTS fileset_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            partner_id INTEGER NOT NULL,
            filename_pattern TEXT NOT NULL,
            filetype_id INTEGER,
            header TEXT NOT NULL,
            recorded_at INTEGER NOT NULL,
            UNIQUE (partner_id, filename_pattern),
            FOREIGN KEY (partner_id) REFERENCES partners(id),
            FOREIGN KEY (filetype_id) REFERENCES filetypes(id)
        )
        "#,
    ),
    (
        "runs",
        r#"
        CREATE TABLE IF NOT EXISTS runs (
            id INTEGER PRIMARY KEY,
            started_at INTEGER NOT NULL
        )
        "#,
    ),
    (
        "partner_status_codes",
        r#"
        CREATE TABLE IF NOT EXISTS partner_status_codes (
            code INTEGER PRIMARY KEY,
            description TEXT NOT NULL
        )
        "#,
    ),
    (
        "file_status_codes",
        r#"
        CREATE TABLE IF NOT EXISTS file_status_codes (
            code INTEGER PRIMARY KEY,
            description TEXT NOT NULL
        )
        "#,
    ),
    (
        "partner_run_status",
        r#"
        CREATE TABLE IF NOT EXISTS partner_run_status (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id INTEGER NOT NULL,
            partner_id INTEGER NOT NULL,
            code INTEGER NOT NULL,
            FOREIGN KEY (run_id) REFERENCES runs(id),
            FOREIGN KEY (partner_id) REFERENCES partners(id),
            FOREIGN KEY (code) REFERENCES partner_status_codes(code)
        )
        "#,
    ),
    (
        "file_run_status",
        r#"
        CREATE TABLE IF NOT EXISTS file_run_status (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id INTEGER NOT NULL,
            partner_id INTEGER NOT NULL,
            filename_pattern TEXT NOT NULL,
            filetype_id INTEGER,
            code INTEGER NOT NULL,
            columns_added TEXT,
            columns_removed TEXT,
            FOREIGN KEY (run_id) REFERENCES runs(id),
            FOREIGN KEY (partner_id) REFERENCES partners(id),
            FOREIGN KEY (code) REFERENCES file_status_codes(code)
        )
        "#,
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_partner_run_status_run ON partner_run_status(run_id)",
    "CREATE INDEX IF NOT EXISTS idx_file_run_status_run ON file_run_status(run_id, partner_id)",
];

/// Create every table and index, then (re)populate the status-code lookup
/// tables from the status enums.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    for (table, ddl) in SCHEMA {
        info!(table, "creating table");
        tolerate_existing(sqlx::query(ddl).execute(pool).await, table)?;
    }
    for ddl in INDEXES {
        sqlx::query(ddl).execute(pool).await?;
    }

    let mut tx = pool.begin().await?;
    for status in PartnerStatus::ALL {
        sqlx::query("INSERT OR REPLACE INTO partner_status_codes (code, description) VALUES (?, ?)")
            .bind(status.code())
            .bind(status.description())
            .execute(&mut *tx)
            .await?;
    }
    for (code, description) in FileStatus::CODES {
        sqlx::query("INSERT OR REPLACE INTO file_status_codes (code, description) VALUES (?, ?)")
            .bind(code)
            .bind(description)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

fn tolerate_existing<T>(result: Result<T, sqlx::Error>, table: &str) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.to_string().contains("already exists") => {
            warn!(table, "table already exists");
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to create table {}", table)),
    }
}

/// Execute one seed SQL file (may contain several statements).
pub async fn load_seed_file(pool: &SqlitePool, path: &Path) -> Result<()> {
    let sql = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {}", path.display()))?;
    info!(file = %path.display(), bytes = sql.len(), "loading seed data");

    let mut tx = pool.begin().await?;
    sqlx::raw_sql(&sql)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to load seed file: {}", path.display()))?;
    tx.commit().await?;
    Ok(())
}

/// `--create`: confirm, create the schema, then offer each seed file.
pub async fn run_create(config: &Config, confirm: &mut dyn Confirm) -> Result<()> {
    let pool = db::connect(config).await?;
    let result = create_with(&pool, config, confirm).await;
    pool.close().await;
    result
}

async fn create_with(pool: &SqlitePool, config: &Config, confirm: &mut dyn Confirm) -> Result<()> {
    if confirm.confirm("Do you wish to create the needed tables?")? {
        create_schema(pool).await?;
        println!("Database schema ready: {}", config.db.path.display());
    } else {
        info!("skipping table creation");
    }

    for path in config.seed.paths() {
        let prompt = format!("Do you wish to load {} into the tables?", path.display());
        if confirm.confirm(&prompt)? {
            load_seed_file(pool, &path).await?;
            println!("Loaded {}", path.display());
        } else {
            info!(file = %path.display(), "skipping seed file");
        }
    }
    Ok(())
}
