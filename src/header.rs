//! Header (schema) diff engine.
//!
//! A file's schema is its first line. The delimiter is not known up front:
//! comma, semicolon and tab are tried in that order and the first one that
//! splits the new header into more than one field wins. Both headers are
//! then split on that delimiter and compared column by column.
//!
//! Column names compare as exact, case-sensitive strings. A renamed column
//! therefore shows up as one removal plus one addition, never as a rename.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::FileError;
use crate::models::FileStatus;

/// Delimiters in the order they are tried.
pub const DELIMITERS: [char; 3] = [',', ';', '\t'];

/// Result of splitting a header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitHeader<'a> {
    pub delimiter: char,
    /// `false` when no delimiter split the line and the last one tried
    /// was used as a fallback (a single-field header).
    pub inferred: bool,
    pub columns: Vec<&'a str>,
}

/// Split `line` on the first delimiter that yields more than one field.
pub fn split_header(line: &str) -> SplitHeader<'_> {
    for delimiter in DELIMITERS {
        let columns: Vec<&str> = line.split(delimiter).collect();
        if columns.len() > 1 {
            return SplitHeader {
                delimiter,
                inferred: true,
                columns,
            };
        }
    }
    SplitHeader {
        delimiter: DELIMITERS[DELIMITERS.len() - 1],
        inferred: false,
        columns: vec![line],
    }
}

/// Column-level difference between a new header and its baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderDiff {
    /// Columns of the new header left over after every baseline column
    /// claimed its exact match, in new-header order.
    pub added: Vec<String>,
    /// Baseline columns with no exact match in the new header, in
    /// baseline order.
    pub removed: Vec<String>,
    /// Number of columns the new header had before matching.
    pub new_column_count: usize,
}

impl HeaderDiff {
    /// Classify the diff. Checks run in a fixed order; the "nothing
    /// matched" case wins over "columns added" so a missing header row is
    /// not reported as a file full of new columns.
    pub fn classify(self) -> FileStatus {
        let HeaderDiff {
            added,
            removed,
            new_column_count,
        } = self;

        if added.is_empty() && removed.is_empty() {
            FileStatus::NoHeaderChange
        } else if added.len() == new_column_count {
            FileStatus::HeaderMissing
        } else if added.is_empty() {
            FileStatus::ColumnsRemoved { removed }
        } else if !removed.is_empty() {
            FileStatus::ColumnsAddedAndRemoved { added, removed }
        } else {
            FileStatus::ColumnsAdded { added }
        }
    }
}

/// Compare `new_header` against `previous_header`.
pub fn diff_headers(new_header: &str, previous_header: &str) -> HeaderDiff {
    let split = split_header(new_header);
    if !split.inferred {
        warn!(
            header = new_header,
            "could not infer a delimiter; treating header as a single column"
        );
    }
    debug!(delimiter = ?split.delimiter, "header delimiter");

    let new_column_count = split.columns.len();
    let mut remaining = split.columns;
    let mut removed = Vec::new();

    for old in previous_header.split(split.delimiter) {
        match remaining.iter().position(|col| *col == old) {
            Some(idx) => {
                remaining.remove(idx);
            }
            None => {
                debug!(column = old, "baseline column missing from new header");
                removed.push(old.to_string());
            }
        }
    }

    HeaderDiff {
        added: remaining.into_iter().map(str::to_string).collect(),
        removed,
        new_column_count,
    }
}

/// Diff and classify in one step.
pub fn compare_headers(new_header: &str, previous_header: &str) -> FileStatus {
    diff_headers(new_header, previous_header).classify()
}

/// Read the first line of `path` with its line terminator removed.
///
/// Only the terminator (`\n` or `\r\n`) and a leading UTF-8 byte order mark
/// are stripped; other whitespace is part of the column names. An empty
/// file yields an empty header.
pub fn read_header_line(path: &Path) -> Result<String, FileError> {
    let file = File::open(path).map_err(|source| FileError::Io {
        file: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let mut line = String::new();
    reader.read_line(&mut line).map_err(|source| {
        if source.kind() == ErrorKind::InvalidData {
            FileError::NotUtf8 {
                file: path.to_path_buf(),
            }
        } else {
            FileError::Io {
                file: path.to_path_buf(),
                source,
            }
        }
    })?;

    Ok(strip_line(&line).to_string())
}

fn strip_line(line: &str) -> &str {
    let line = line.strip_prefix('\u{feff}').unwrap_or(line);
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
