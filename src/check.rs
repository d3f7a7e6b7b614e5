//! Drift check orchestration (the default `data-inbox` invocation).
//!
//! One run:
//!
//! 1. back up the database file (when configured);
//! 2. load the partner registry and fileset snapshot;
//! 3. allocate the run id;
//! 4. classify every partner, then match and diff the files of partners
//!    with new data;
//! 5. write all status rows for the run in one transaction;
//! 6. build the report from the stored rows, print it and write it to the
//!    report directory.
//!
//! Evaluation only reads the filesystem and the loaded snapshots, so two
//! runs over unchanged inputs produce identical rows under different ids.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{Local, Utc};
use tracing::{info, warn};

use crate::availability::classify_partner;
use crate::config::Config;
use crate::db;
use crate::matcher::{evaluate_directory, MatchOptions};
use crate::models::{PartnerEvaluation, PartnerStatus, RunId, RunOutcome};
use crate::registry::{FilesetSnapshot, PartnerRegistry};
use crate::report::{load_run_report, write_report};
use crate::sqlite_store::SqliteStore;
use crate::store::Store;

/// Classify every partner in registry order and evaluate the files of
/// those with new data.
pub fn evaluate(
    registry: &PartnerRegistry,
    fileset: &FilesetSnapshot,
    options: &MatchOptions,
) -> RunOutcome {
    let mut outcome = RunOutcome::default();
    for partner in registry.iter() {
        let status = classify_partner(partner);
        outcome.partners.push(PartnerEvaluation {
            partner_id: partner.id,
            status,
        });
        if status == PartnerStatus::HasNewFiles {
            let files = evaluate_directory(partner, fileset.for_partner(partner.id), options);
            outcome.files.extend(files);
        }
    }
    outcome
}

/// Result of one completed check.
#[derive(Debug, Clone)]
pub struct CheckSummary {
    pub run_id: RunId,
    pub report: String,
    pub exceptions: usize,
}

/// Run one drift check against `store` and render its report.
pub async fn run_check(store: &dyn Store, config: &Config) -> Result<CheckSummary> {
    let registry = PartnerRegistry::new(store.partners().await?);
    let fileset = FilesetSnapshot::new(store.fileset_entries().await?);
    if registry.is_empty() {
        warn!("no partners registered; nothing to check");
    }
    if fileset.is_empty() {
        warn!("no fileset recorded for any partner; headers will not be checked");
    }
    info!(
        partners = registry.len(),
        fileset_entries = fileset.len(),
        "loaded snapshots"
    );

    let run = store.begin_run(Utc::now()).await?;
    info!(run_id = run.id, "run started");

    let outcome = evaluate(&registry, &fileset, &config.matching.match_options());
    store.record_run(run.id, &outcome).await?;

    let exceptions = outcome
        .files
        .iter()
        .filter(|f| f.status.is_exception())
        .count();
    info!(
        run_id = run.id,
        partners = outcome.partners.len(),
        files = outcome.files.len(),
        exceptions,
        "run recorded"
    );

    let report = load_run_report(store, run.id)
        .await?
        .render(&registry, &config.report.title);
    Ok(CheckSummary {
        run_id: run.id,
        report,
        exceptions,
    })
}

/// Full drift check against the configured database. Returns the report
/// file path when one was written.
pub async fn run_drift_check(config: &Config, write_file: bool) -> Result<Option<PathBuf>> {
    if config.db.backup {
        db::backup_database(&config.db.path)?;
    }
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let result = run_check(&store, config).await;
    pool.close().await;
    let summary = result?;

    print!("{}", summary.report);
    if !write_file {
        return Ok(None);
    }
    let path = write_report(
        &config.report.dir,
        Local::now().date_naive(),
        &summary.report,
    )?;
    Ok(Some(path))
}

/// Re-render the report of a past run.
pub async fn render_past_run(store: &dyn Store, config: &Config, run_id: RunId) -> Result<String> {
    let registry = PartnerRegistry::new(store.partners().await?);
    let report = load_run_report(store, run_id).await?;
    Ok(report.render(&registry, &config.report.title))
}

/// `--report-run ID`: print a past run's report without evaluating anything.
pub async fn run_report(config: &Config, run_id: RunId) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let result = render_past_run(&store, config, run_id).await;
    pool.close().await;
    print!("{}", result?);
    Ok(())
}
