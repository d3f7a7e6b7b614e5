//! In-memory [`Store`] implementation for tests.
//!
//! Uses `Vec`s behind `std::sync::RwLock`. Writes validate the same
//! references the SQLite schema enforces with foreign keys, and are staged
//! before being applied so a failed write leaves nothing behind.

use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    FileRunStatus, FilesetChange, FilesetEntry, Filetype, Partner, PartnerRunStatus, Run,
    RunId, RunOutcome,
};

use super::Store;

/// In-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    partners: RwLock<Vec<Partner>>,
    filetypes: RwLock<Vec<Filetype>>,
    fileset: RwLock<Vec<FilesetEntry>>,
    runs: RwLock<Vec<Run>>,
    partner_statuses: RwLock<Vec<PartnerRunStatus>>,
    file_statuses: RwLock<Vec<FileRunStatus>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_partner(&self, partner: Partner) {
        self.partners.write().unwrap().push(partner);
    }

    pub fn add_filetype(&self, filetype: Filetype) {
        self.filetypes.write().unwrap().push(filetype);
    }

    pub fn add_fileset_entry(&self, entry: FilesetEntry) {
        self.fileset.write().unwrap().push(entry);
    }

    fn has_partner(&self, id: i64) -> bool {
        self.partners.read().unwrap().iter().any(|p| p.id == id)
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn partners(&self) -> Result<Vec<Partner>> {
        let mut partners = self.partners.read().unwrap().clone();
        partners.sort_by_key(|p| p.id);
        Ok(partners)
    }

    async fn filetypes(&self) -> Result<Vec<Filetype>> {
        let mut filetypes = self.filetypes.read().unwrap().clone();
        filetypes.sort_by_key(|ft| ft.id);
        Ok(filetypes)
    }

    async fn fileset_entries(&self) -> Result<Vec<FilesetEntry>> {
        Ok(self.fileset.read().unwrap().clone())
    }

    async fn begin_run(&self, started_at: DateTime<Utc>) -> Result<Run> {
        let mut runs = self.runs.write().unwrap();
        let id = runs.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let run = Run { id, started_at };
        runs.push(run.clone());
        Ok(run)
    }

    async fn record_run(&self, run_id: RunId, outcome: &RunOutcome) -> Result<()> {
        if !self.runs.read().unwrap().iter().any(|r| r.id == run_id) {
            bail!("run {} does not exist", run_id);
        }

        let mut partner_rows = Vec::with_capacity(outcome.partners.len());
        for p in &outcome.partners {
            if !self.has_partner(p.partner_id) {
                bail!("partner {} does not exist", p.partner_id);
            }
            partner_rows.push(PartnerRunStatus {
                run_id,
                partner_id: p.partner_id,
                status: p.status,
            });
        }

        let mut file_rows = Vec::with_capacity(outcome.files.len());
        for f in &outcome.files {
            if !self.has_partner(f.partner_id) {
                bail!("partner {} does not exist", f.partner_id);
            }
            file_rows.push(FileRunStatus {
                run_id,
                partner_id: f.partner_id,
                filename: f.filename.clone(),
                filetype_id: f.filetype_id,
                status: f.status.clone(),
            });
        }

        self.partner_statuses.write().unwrap().extend(partner_rows);
        self.file_statuses.write().unwrap().extend(file_rows);
        Ok(())
    }

    async fn run(&self, run_id: RunId) -> Result<Option<Run>> {
        Ok(self
            .runs
            .read()
            .unwrap()
            .iter()
            .find(|r| r.id == run_id)
            .cloned())
    }

    async fn partner_statuses(&self, run_id: RunId) -> Result<Vec<PartnerRunStatus>> {
        Ok(self
            .partner_statuses
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.run_id == run_id)
            .cloned()
            .collect())
    }

    async fn file_statuses(&self, run_id: RunId) -> Result<Vec<FileRunStatus>> {
        Ok(self
            .file_statuses
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.run_id == run_id)
            .cloned()
            .collect())
    }

    async fn apply_fileset_changes(&self, changes: &[FilesetChange]) -> Result<()> {
        for change in changes {
            if !self.has_partner(change.entry().partner_id) {
                bail!("partner {} does not exist", change.entry().partner_id);
            }
        }

        let mut fileset = self.fileset.write().unwrap();
        let mut staged = fileset.clone();
        for change in changes {
            let entry = change.entry();
            let replaces_type = matches!(change, FilesetChange::Replace(_));
            staged.retain(|e| {
                e.partner_id != entry.partner_id
                    || (e.filename_pattern != entry.filename_pattern
                        && !(replaces_type && e.filetype_id == entry.filetype_id))
            });
            staged.push(entry.clone());
        }
        *fileset = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileEvaluation, FileStatus, PartnerEvaluation, PartnerStatus};

    fn partner(id: i64) -> Partner {
        Partner {
            id,
            name: format!("p{}", id),
            full_name: format!("Partner {}", id),
            directory: "/nonexistent".into(),
            stored_directory: None,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_run_ids_increase_and_survive_failed_record() {
        let store = InMemoryStore::new();
        store.add_partner(partner(1));
        let r1 = store.begin_run(Utc::now()).await.unwrap();
        let bad = RunOutcome {
            partners: vec![PartnerEvaluation {
                partner_id: 99,
                status: PartnerStatus::NoNewData,
            }],
            files: vec![],
        };
        assert!(store.record_run(r1.id, &bad).await.is_err());
        assert!(store.partner_statuses(r1.id).await.unwrap().is_empty());

        let r2 = store.begin_run(Utc::now()).await.unwrap();
        assert_eq!((r1.id, r2.id), (1, 2));
    }

    #[tokio::test]
    async fn test_record_run_is_all_or_nothing() {
        let store = InMemoryStore::new();
        store.add_partner(partner(1));
        let run = store.begin_run(Utc::now()).await.unwrap();
        let outcome = RunOutcome {
            partners: vec![PartnerEvaluation {
                partner_id: 1,
                status: PartnerStatus::HasNewFiles,
            }],
            files: vec![FileEvaluation {
                partner_id: 2,
                filename: "LABS.csv".into(),
                filetype_id: None,
                status: FileStatus::NoPriorFileset,
            }],
        };
        assert!(store.record_run(run.id, &outcome).await.is_err());
        assert!(store.partner_statuses(run.id).await.unwrap().is_empty());
        assert!(store.file_statuses(run.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_only_touches_same_partner_and_type() {
        let store = InMemoryStore::new();
        store.add_partner(partner(1));
        store.add_partner(partner(2));
        let entry = |pid, pattern: &str, ft: Option<i64>| FilesetEntry {
            partner_id: pid,
            filename_pattern: pattern.into(),
            filetype_id: ft,
            header: "h".into(),
            recorded_at: Utc::now(),
        };
        store.add_fileset_entry(entry(1, "DEMO_OLD", Some(1)));
        store.add_fileset_entry(entry(2, "DEMO", Some(1)));
        store.add_fileset_entry(entry(1, "misc", None));

        store
            .apply_fileset_changes(&[FilesetChange::Replace(entry(1, "DEMO_NEW", Some(1)))])
            .await
            .unwrap();

        let mut patterns: Vec<_> = store
            .fileset_entries()
            .await
            .unwrap()
            .into_iter()
            .map(|e| (e.partner_id, e.filename_pattern))
            .collect();
        patterns.sort();
        assert_eq!(
            patterns,
            vec![
                (1, "DEMO_NEW".to_string()),
                (1, "misc".to_string()),
                (2, "DEMO".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_one_entry_per_partner_and_pattern() {
        let store = InMemoryStore::new();
        store.add_partner(partner(1));
        let entry = |pattern: &str, ft: Option<i64>, header: &str| FilesetEntry {
            partner_id: 1,
            filename_pattern: pattern.into(),
            filetype_id: ft,
            header: header.into(),
            recorded_at: Utc::now(),
        };
        store.add_fileset_entry(entry("LABS", None, "pid,date"));
        store.add_fileset_entry(entry("VITAL", Some(3), "pid,height"));

        store
            .apply_fileset_changes(&[
                FilesetChange::Replace(entry("LABS", Some(2), "pid,date,value")),
                FilesetChange::Insert(entry("VITAL", None, "pid")),
            ])
            .await
            .unwrap();

        let mut entries: Vec<_> = store
            .fileset_entries()
            .await
            .unwrap()
            .into_iter()
            .map(|e| (e.filename_pattern, e.filetype_id, e.header))
            .collect();
        entries.sort();
        assert_eq!(
            entries,
            vec![
                ("LABS".to_string(), Some(2), "pid,date,value".to_string()),
                ("VITAL".to_string(), None, "pid".to_string()),
            ]
        );
    }
}
