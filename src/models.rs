//! Core data models used throughout data-inbox.
//!
//! These types describe partners, the fileset history recorded for them,
//! and the append-only status rows produced by each drift-check run.

use std::fmt;
use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

pub type PartnerId = i64;
pub type RunId = i64;
pub type FiletypeId = i64;

/// An external data-submitting entity with one watch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partner {
    pub id: PartnerId,
    pub name: String,
    pub full_name: String,
    /// Inbound directory scanned by the drift check.
    pub directory: PathBuf,
    /// Historical directory tree scanned by the fileset build.
    pub stored_directory: Option<PathBuf>,
    pub enabled: bool,
}

/// One entry of the controlled filetype vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filetype {
    pub id: FiletypeId,
    pub name: String,
}

/// A previously recorded file signature for a partner.
///
/// `filetype_id` is `None` for the catch-all "unidentified" type; those
/// entries are keyed by their own filename pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesetEntry {
    pub partner_id: PartnerId,
    pub filename_pattern: String,
    pub filetype_id: Option<FiletypeId>,
    pub header: String,
    pub recorded_at: DateTime<Utc>,
}

/// One execution of the drift-detection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub id: RunId,
    pub started_at: DateTime<Utc>,
}

/// Partner-level status, one per partner per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PartnerStatus {
    NoNewData,
    DirectoryNotFound,
    HasNewFiles,
    NotChecked,
}

impl PartnerStatus {
    pub const ALL: [PartnerStatus; 4] = [
        PartnerStatus::NoNewData,
        PartnerStatus::DirectoryNotFound,
        PartnerStatus::HasNewFiles,
        PartnerStatus::NotChecked,
    ];

    pub fn code(self) -> i64 {
        match self {
            PartnerStatus::NoNewData => 1,
            PartnerStatus::DirectoryNotFound => 2,
            PartnerStatus::HasNewFiles => 3,
            PartnerStatus::NotChecked => 4,
        }
    }

    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            1 => Ok(PartnerStatus::NoNewData),
            2 => Ok(PartnerStatus::DirectoryNotFound),
            3 => Ok(PartnerStatus::HasNewFiles),
            4 => Ok(PartnerStatus::NotChecked),
            other => bail!("unknown partner status code {}", other),
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PartnerStatus::NoNewData => "No new data",
            PartnerStatus::DirectoryNotFound => "Directory not found",
            PartnerStatus::HasNewFiles => "New data",
            PartnerStatus::NotChecked => "Not checked",
        }
    }
}

/// File-level status. Column lists live only on the two diff variants
/// that report them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    NoHeaderChange,
    ColumnsAdded { added: Vec<String> },
    ColumnsRemoved { removed: Vec<String> },
    HeaderMissing,
    UnidentifiedFiletype,
    ColumnsAddedAndRemoved { added: Vec<String>, removed: Vec<String> },
    NoPriorFileset,
}

impl FileStatus {
    /// `(code, description)` for every variant, used to populate the
    /// `file_status_codes` lookup table.
    pub const CODES: [(i64, &'static str); 7] = [
        (1, "No header change"),
        (2, "Columns added"),
        (3, "Columns removed"),
        (4, "Header missing"),
        (5, "Unidentified filetype"),
        (6, "Columns added and removed"),
        (7, "No prior fileset"),
    ];

    pub fn code(&self) -> i64 {
        match self {
            FileStatus::NoHeaderChange => 1,
            FileStatus::ColumnsAdded { .. } => 2,
            FileStatus::ColumnsRemoved { .. } => 3,
            FileStatus::HeaderMissing => 4,
            FileStatus::UnidentifiedFiletype => 5,
            FileStatus::ColumnsAddedAndRemoved { .. } => 6,
            FileStatus::NoPriorFileset => 7,
        }
    }

    /// Rebuild a status from its stored code and nullable column lists.
    pub fn from_parts(
        code: i64,
        added: Option<Vec<String>>,
        removed: Option<Vec<String>>,
    ) -> Result<Self> {
        let status = match code {
            1 => FileStatus::NoHeaderChange,
            2 => FileStatus::ColumnsAdded {
                added: added.unwrap_or_default(),
            },
            3 => FileStatus::ColumnsRemoved {
                removed: removed.unwrap_or_default(),
            },
            4 => FileStatus::HeaderMissing,
            5 => FileStatus::UnidentifiedFiletype,
            6 => FileStatus::ColumnsAddedAndRemoved {
                added: added.unwrap_or_default(),
                removed: removed.unwrap_or_default(),
            },
            7 => FileStatus::NoPriorFileset,
            other => bail!("unknown file status code {}", other),
        };
        Ok(status)
    }

    pub fn added(&self) -> Option<&[String]> {
        match self {
            FileStatus::ColumnsAdded { added } | FileStatus::ColumnsAddedAndRemoved { added, .. } => {
                Some(added)
            }
            _ => None,
        }
    }

    pub fn removed(&self) -> Option<&[String]> {
        match self {
            FileStatus::ColumnsRemoved { removed }
            | FileStatus::ColumnsAddedAndRemoved { removed, .. } => Some(removed),
            _ => None,
        }
    }

    /// Everything except an unchanged header needs a human look.
    pub fn is_exception(&self) -> bool {
        !matches!(self, FileStatus::NoHeaderChange)
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.code();
        let description = FileStatus::CODES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, d)| *d)
            .unwrap_or("unknown");
        write!(f, "{} ({})", description, code)
    }
}

/// Partner-level classification produced by a run, before it is tagged
/// with a run id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerEvaluation {
    pub partner_id: PartnerId,
    pub status: PartnerStatus,
}

/// File-level classification produced by a run, before it is tagged
/// with a run id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvaluation {
    pub partner_id: PartnerId,
    pub filename: String,
    pub filetype_id: Option<FiletypeId>,
    pub status: FileStatus,
}

/// Everything one drift-check pass decided. Buffered in memory and
/// written in a single transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub partners: Vec<PartnerEvaluation>,
    pub files: Vec<FileEvaluation>,
}

/// Stored partner status row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerRunStatus {
    pub run_id: RunId,
    pub partner_id: PartnerId,
    pub status: PartnerStatus,
}

/// Stored file status row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRunStatus {
    pub run_id: RunId,
    pub partner_id: PartnerId,
    pub filename: String,
    pub filetype_id: Option<FiletypeId>,
    pub status: FileStatus,
}

/// A write against the fileset history, produced by the fileset build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilesetChange {
    /// Delete any entry for `(partner, filetype)` and insert this one.
    Replace(FilesetEntry),
    /// Append this entry (catch-all entries accumulate).
    Insert(FilesetEntry),
}

impl FilesetChange {
    pub fn entry(&self) -> &FilesetEntry {
        match self {
            FilesetChange::Replace(entry) | FilesetChange::Insert(entry) => entry,
        }
    }
}
