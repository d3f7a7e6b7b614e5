//! Fileset build (`data-inbox --build-fileset`).
//!
//! Seeds or refreshes each partner's recorded fileset from its stored
//! delivery history. Directories are taken newest first, and the operator
//! is asked before each one; declining stops that partner and moves on.
//! All writes of a build go to the store in one batch at the end.

use anyhow::Result;
use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::confirm::Confirm;
use crate::db;
use crate::filetype::{guess_filetype, history_files, FilesetPlanner, HistoryCursor};
use crate::header::read_header_line;
use crate::matcher::{base_name, split_file_name, MatchOptions};
use crate::models::{FilesetChange, Partner};
use crate::registry::{FilesetSnapshot, FiletypeVocabulary, PartnerRegistry};
use crate::sqlite_store::SqliteStore;
use crate::store::Store;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub partners_scanned: usize,
    pub directories_scanned: usize,
    pub entries_written: usize,
}

/// Scan every partner with a stored directory and write the planned
/// fileset changes.
pub async fn build_filesets(
    store: &dyn Store,
    confirm: &mut dyn Confirm,
    options: &MatchOptions,
    threshold: u8,
) -> Result<BuildSummary> {
    let registry = PartnerRegistry::new(store.partners().await?);
    let vocabulary = FiletypeVocabulary::new(store.filetypes().await?);
    let fileset = FilesetSnapshot::new(store.fileset_entries().await?);
    if vocabulary.is_empty() {
        warn!("filetype vocabulary is empty; every file will be recorded as unidentified");
    }
    info!(
        partners = registry.len(),
        filetypes = vocabulary.len(),
        fileset_entries = fileset.len(),
        "loaded snapshots"
    );

    let mut summary = BuildSummary::default();
    let mut changes = Vec::new();
    for partner in registry.iter() {
        let Some(planned) = scan_partner(
            partner,
            &vocabulary,
            &fileset,
            confirm,
            options,
            threshold,
            &mut summary,
        )?
        else {
            continue;
        };
        summary.partners_scanned += 1;
        changes.extend(planned);
    }

    store.apply_fileset_changes(&changes).await?;
    summary.entries_written = changes.len();
    info!(
        partners = summary.partners_scanned,
        directories = summary.directories_scanned,
        entries = summary.entries_written,
        "fileset build complete"
    );
    Ok(summary)
}

/// Plan one partner's changes. `None` when the partner has no history to
/// scan.
fn scan_partner(
    partner: &Partner,
    vocabulary: &FiletypeVocabulary,
    fileset: &FilesetSnapshot,
    confirm: &mut dyn Confirm,
    options: &MatchOptions,
    threshold: u8,
    summary: &mut BuildSummary,
) -> Result<Option<Vec<FilesetChange>>> {
    let Some(stored) = &partner.stored_directory else {
        info!(partner = %partner.full_name, "no stored directory; skipping");
        return Ok(None);
    };
    let mut cursor = match HistoryCursor::open(stored) {
        Ok(cursor) => cursor,
        Err(e) => {
            error!(partner = %partner.full_name, error = %e, "cannot scan stored directory");
            return Ok(None);
        }
    };

    let mut planner = FilesetPlanner::new(partner.id, fileset.for_partner(partner.id));
    while let Some(pending) = cursor.peek() {
        let prompt = format!(
            "There are {} remaining directories to scan for {}. Continue?",
            pending.remaining, partner.full_name
        );
        if !confirm.confirm(&prompt)? {
            break;
        }
        cursor.advance();
        summary.directories_scanned += 1;
        info!(partner = %partner.full_name, directory = %pending.path.display(), "scanning");

        let files = match history_files(&pending.path) {
            Ok(files) => files,
            Err(e) => {
                warn!(
                    partner = %partner.full_name,
                    directory = %pending.path.display(),
                    error = %e,
                    "cannot list history directory; skipping it"
                );
                continue;
            }
        };
        for path in files {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if base_name(&file_name).is_empty() {
                warn!(file = %file_name, "no base name; not recorded");
                continue;
            }
            if let Some((_, extension)) = split_file_name(&file_name) {
                if options.skip_extensions.contains(&extension) {
                    continue;
                }
            }
            let header = match read_header_line(&path) {
                Ok(header) => header,
                Err(e) => {
                    warn!(error = %e, "file not recorded");
                    continue;
                }
            };
            let guess = guess_filetype(&file_name, vocabulary, threshold);
            planner.add(&file_name, &header, guess, Utc::now());
        }
    }
    if !cursor.is_exhausted() {
        info!(
            partner = %partner.full_name,
            remaining = cursor.remaining(),
            "scan stopped by operator"
        );
    }
    Ok(Some(planner.into_changes()))
}

/// `--build-fileset` against the configured database.
pub async fn run_build(config: &Config, confirm: &mut dyn Confirm) -> Result<BuildSummary> {
    if config.db.backup {
        db::backup_database(&config.db.path)?;
    }
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let result = build_filesets(
        &store,
        confirm,
        &config.matching.match_options(),
        config.matching.filetype_match_ratio,
    )
    .await;
    pool.close().await;
    result
}
