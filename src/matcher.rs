//! Fileset matcher.
//!
//! For a partner with new files, pairs every file in the watch directory
//! with the most similar previously recorded filename pattern and hands it
//! to the header diff engine.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::error::FileError;
use crate::fuzzy::{normalize_filename, ratio};
use crate::header::{compare_headers, read_header_line};
use crate::models::{FileEvaluation, FileStatus, FilesetEntry, Partner};

/// Extensions of non-tabular formats that are never checked.
pub const DEFAULT_SKIP_EXTENSIONS: [&str; 4] = ["pdf", "xlsx", "xls", "zip"];

/// Options for matching a partner's new files.
#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// Lower-case extensions, without the leading dot.
    pub skip_extensions: Vec<String>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            skip_extensions: DEFAULT_SKIP_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl MatchOptions {
    fn skips(&self, extension: &str) -> bool {
        self.skip_extensions.iter().any(|s| s == extension)
    }
}

/// The base name of a file: everything before the first `.`.
pub fn base_name(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}

/// Split a file name into its base (before the first `.`) and its
/// lower-cased extension (after the last `.`). `None` when there is no
/// usable extension or no base to match on.
pub fn split_file_name(file_name: &str) -> Option<(&str, String)> {
    let (base, _) = file_name.split_once('.')?;
    let (_, ext) = file_name.rsplit_once('.')?;
    if base.is_empty() || ext.is_empty() {
        return None;
    }
    Some((base, ext.to_lowercase()))
}

/// The highest-scoring recorded entry for a new file.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub entry: &'a FilesetEntry,
    pub score: u8,
}

/// Score `base` against every entry; the first of equally scored entries
/// wins. Returns `None` when nothing scores above zero.
pub fn best_match<'a>(base: &str, entries: &'a [FilesetEntry]) -> Option<Candidate<'a>> {
    let needle = normalize_filename(base);
    let mut best: Option<Candidate<'a>> = None;
    for entry in entries {
        let score = ratio(&needle, &normalize_filename(&entry.filename_pattern));
        debug!(pattern = %entry.filename_pattern, score, "candidate score");
        if score > best.map_or(0, |b| b.score) {
            best = Some(Candidate { entry, score });
        }
    }
    best
}

/// Evaluate one file of a partner's watch directory.
///
/// `Ok(None)` means the file was skipped on purpose (non-tabular format);
/// `Err` is a per-file problem the caller logs before moving on.
pub fn evaluate_file(
    partner: &Partner,
    path: &Path,
    entries: &[FilesetEntry],
    options: &MatchOptions,
) -> Result<Option<FileEvaluation>, FileError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let (base, extension) =
        split_file_name(&file_name).ok_or_else(|| FileError::NoExtension {
            file: file_name.clone(),
        })?;

    if options.skips(&extension) {
        debug!(file = %file_name, "skipping non-tabular file");
        return Ok(None);
    }

    if entries.is_empty() {
        return Ok(Some(FileEvaluation {
            partner_id: partner.id,
            filename: file_name,
            filetype_id: None,
            status: FileStatus::NoPriorFileset,
        }));
    }

    let Some(candidate) = best_match(base, entries) else {
        info!(file = %file_name, "no recorded pattern resembles this file");
        return Ok(Some(FileEvaluation {
            partner_id: partner.id,
            filename: file_name,
            filetype_id: None,
            status: FileStatus::UnidentifiedFiletype,
        }));
    };

    info!(
        file = %file_name,
        pattern = %candidate.entry.filename_pattern,
        score = candidate.score,
        "matched recorded pattern"
    );
    let header = read_header_line(path)?;
    let status = compare_headers(&header, &candidate.entry.header);
    info!(file = %file_name, status = %status, "header checked");

    Ok(Some(FileEvaluation {
        partner_id: partner.id,
        filename: file_name,
        filetype_id: candidate.entry.filetype_id,
        status,
    }))
}

/// Evaluate every regular file directly inside the partner's watch
/// directory, in file-name order. Per-file errors are logged and the file
/// is left out.
pub fn evaluate_directory(
    partner: &Partner,
    entries: &[FilesetEntry],
    options: &MatchOptions,
) -> Vec<FileEvaluation> {
    if entries.is_empty() {
        warn!(
            partner = %partner.full_name,
            "no previous fileset recorded; headers will not be checked"
        );
    }

    let files = match list_files(&partner.directory) {
        Ok(files) => files,
        Err(e) => {
            error!(
                partner = %partner.full_name,
                directory = %partner.directory.display(),
                error = %e,
                "cannot list watch directory"
            );
            return Vec::new();
        }
    };

    let mut evaluations = Vec::new();
    for path in files {
        match evaluate_file(partner, &path, entries, options) {
            Ok(Some(evaluation)) => evaluations.push(evaluation),
            Ok(None) => {}
            Err(e) => warn!(partner = %partner.full_name, error = %e, "file will not be checked"),
        }
    }
    evaluations
}

/// Regular files (symlinks followed) directly inside `dir`, sorted by name.
fn list_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        } else {
            debug!(path = %path.display(), "skipping non-file entry");
        }
    }
    files.sort();
    Ok(files)
}
