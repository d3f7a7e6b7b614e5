//! Storage abstraction for data-inbox.
//!
//! The [`Store`] trait is the only way the run orchestrators reach
//! persistent state: loading the per-run snapshots, allocating run ids,
//! writing a run's status rows and reading them back for reports.
//!
//! History is append-only. Status rows are never updated or deleted, so a
//! report can be rebuilt at any time from a past run id.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    FileRunStatus, FilesetChange, FilesetEntry, Filetype, Partner, PartnerRunStatus, Run,
    RunId, RunOutcome,
};

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`partners`](Store::partners) | Partner registry, ordered by id |
/// | [`filetypes`](Store::filetypes) | Filetype vocabulary |
/// | [`fileset_entries`](Store::fileset_entries) | Recorded fileset, all partners |
/// | [`begin_run`](Store::begin_run) | Allocate and durably record the next run id |
/// | [`record_run`](Store::record_run) | Write a run's status rows atomically |
/// | [`run`](Store::run) | Look up a run by id |
/// | [`partner_statuses`](Store::partner_statuses) | Partner rows of a run |
/// | [`file_statuses`](Store::file_statuses) | File rows of a run |
/// | [`apply_fileset_changes`](Store::apply_fileset_changes) | Write a fileset build atomically |
#[async_trait]
pub trait Store: Send + Sync {
    async fn partners(&self) -> Result<Vec<Partner>>;

    async fn filetypes(&self) -> Result<Vec<Filetype>>;

    async fn fileset_entries(&self) -> Result<Vec<FilesetEntry>>;

    /// Allocate `max(existing id) + 1` (1 when empty) and record the run
    /// before returning. A run that later fails keeps its id; it is never
    /// handed out again.
    async fn begin_run(&self, started_at: DateTime<Utc>) -> Result<Run>;

    /// Write every status row of `outcome` under `run_id`, all or nothing.
    async fn record_run(&self, run_id: RunId, outcome: &RunOutcome) -> Result<()>;

    async fn run(&self, run_id: RunId) -> Result<Option<Run>>;

    /// Partner rows of a run, in insertion order.
    async fn partner_statuses(&self, run_id: RunId) -> Result<Vec<PartnerRunStatus>>;

    /// File rows of a run, in insertion order.
    async fn file_statuses(&self, run_id: RunId) -> Result<Vec<FileRunStatus>>;

    /// Apply fileset build writes, all or nothing.
    async fn apply_fileset_changes(&self, changes: &[FilesetChange]) -> Result<()>;
}
