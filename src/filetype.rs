//! Filetype classification for the fileset build.
//!
//! The fileset build seeds the history the matcher compares against. It
//! walks a partner's stored directory tree one historical delivery at a
//! time (newest first), guesses each file's type from its name against the
//! controlled vocabulary, and plans the fileset writes.
//!
//! Pacing is explicit: [`HistoryCursor`] yields one directory at a time and
//! the caller decides, through whatever confirmation it holds, whether to
//! take the next one.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::fuzzy::ratio;
use crate::matcher::base_name;
use crate::models::{FilesetChange, FilesetEntry, Filetype, FiletypeId, PartnerId};
use crate::registry::FiletypeVocabulary;

/// Default similarity a name must exceed to count as a partial match.
pub const DEFAULT_MATCH_RATIO: u8 = 80;

/// Outcome of guessing a file's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiletypeGuess<'a> {
    /// Upper-cased base name equals a vocabulary name.
    Exact(&'a Filetype),
    /// First vocabulary name scoring above the threshold, or contained in
    /// the base name.
    Partial(&'a Filetype),
    /// Catch-all; the file is recorded under its own name.
    Unidentified,
}

impl FiletypeGuess<'_> {
    pub fn filetype_id(&self) -> Option<FiletypeId> {
        match self {
            FiletypeGuess::Exact(ft) | FiletypeGuess::Partial(ft) => Some(ft.id),
            FiletypeGuess::Unidentified => None,
        }
    }
}

/// Guess the filetype of `file_name` (extension optional).
pub fn guess_filetype<'a>(
    file_name: &str,
    vocabulary: &'a FiletypeVocabulary,
    threshold: u8,
) -> FiletypeGuess<'a> {
    let base = base_name(file_name).to_uppercase();

    if let Some(ft) = vocabulary.exact(&base) {
        info!(file = file_name, filetype = %ft.name, "exact filetype match");
        return FiletypeGuess::Exact(ft);
    }

    for ft in vocabulary.iter() {
        let score = ratio(&base, &ft.name);
        if score > threshold || base.contains(ft.name.as_str()) {
            info!(file = file_name, filetype = %ft.name, score, "partial filetype match");
            return FiletypeGuess::Partial(ft);
        }
    }

    info!(file = file_name, "no filetype match; recording under its own name");
    FiletypeGuess::Unidentified
}

/// One historical directory handed out by the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDirectory {
    pub path: PathBuf,
    /// Directories left to scan, this one included.
    pub remaining: usize,
}

/// Resumable cursor over a partner's historical deliveries.
///
/// Holds the immediate subdirectories of the stored directory, newest
/// first (reverse lexical order of their names, which are dated).
#[derive(Debug, Clone)]
pub struct HistoryCursor {
    dirs: Vec<PathBuf>,
    position: usize,
}

impl HistoryCursor {
    pub fn open(stored_directory: &Path) -> Result<Self> {
        let mut dirs = Vec::new();
        let listing = std::fs::read_dir(stored_directory).with_context(|| {
            format!(
                "Failed to list stored directory: {}",
                stored_directory.display()
            )
        })?;
        for entry in listing {
            let path = entry?.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        dirs.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
        Ok(Self { dirs, position: 0 })
    }

    /// The directory that would be scanned next, without consuming it.
    pub fn peek(&self) -> Option<PendingDirectory> {
        self.dirs.get(self.position).map(|path| PendingDirectory {
            path: path.clone(),
            remaining: self.remaining(),
        })
    }

    /// Consume and return the next directory.
    pub fn advance(&mut self) -> Option<PendingDirectory> {
        let next = self.peek()?;
        self.position += 1;
        Some(next)
    }

    pub fn remaining(&self) -> usize {
        self.dirs.len() - self.position
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

/// Regular files directly inside one historical directory, sorted by name.
pub fn history_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Plans fileset writes for one partner during a build pass.
///
/// A partner keeps at most one entry per filename pattern. Known types
/// also keep one entry per type: the first file of that type seen in this
/// pass (the newest delivery) replaces whatever was recorded before, and
/// older deliveries of the same type are ignored. Unidentified files
/// accumulate, one entry per distinct filename pattern.
#[derive(Debug)]
pub struct FilesetPlanner {
    partner_id: PartnerId,
    known_written: HashSet<FiletypeId>,
    patterns_written: HashSet<String>,
    unidentified_patterns: HashSet<String>,
    changes: Vec<FilesetChange>,
}

impl FilesetPlanner {
    pub fn new(partner_id: PartnerId, existing: &[FilesetEntry]) -> Self {
        let unidentified_patterns = existing
            .iter()
            .filter(|e| e.partner_id == partner_id && e.filetype_id.is_none())
            .map(|e| e.filename_pattern.clone())
            .collect();
        Self {
            partner_id,
            known_written: HashSet::new(),
            patterns_written: HashSet::new(),
            unidentified_patterns,
            changes: Vec::new(),
        }
    }

    /// Record one scanned file. Returns `true` if it produced a write.
    pub fn add(
        &mut self,
        file_name: &str,
        header: &str,
        guess: FiletypeGuess<'_>,
        recorded_at: DateTime<Utc>,
    ) -> bool {
        let entry = FilesetEntry {
            partner_id: self.partner_id,
            filename_pattern: base_name(file_name).to_string(),
            filetype_id: guess.filetype_id(),
            header: header.to_string(),
            recorded_at,
        };

        if self.patterns_written.contains(&entry.filename_pattern) {
            debug!(file = file_name, "newer file with this name already recorded");
            return false;
        }

        match entry.filetype_id {
            Some(id) => {
                if !self.known_written.insert(id) {
                    debug!(file = file_name, filetype_id = id, "newer file of this type already recorded");
                    return false;
                }
                self.patterns_written.insert(entry.filename_pattern.clone());
                self.changes.push(FilesetChange::Replace(entry));
            }
            None => {
                if !self.unidentified_patterns.insert(entry.filename_pattern.clone()) {
                    info!(file = file_name, "unidentified file with this name already recorded");
                    return false;
                }
                self.patterns_written.insert(entry.filename_pattern.clone());
                self.changes.push(FilesetChange::Insert(entry));
            }
        }
        true
    }

    pub fn into_changes(self) -> Vec<FilesetChange> {
        self.changes
    }
}
