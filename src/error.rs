//! Per-file errors.
//!
//! None of these abort a run: the offending file is logged and skipped.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("{file} has no file extension and cannot be classified")]
    NoExtension { file: String },

    #[error("{} is not valid UTF-8; header could not be read", file.display())]
    NotUtf8 { file: PathBuf },

    #[error("failed to read {}: {source}", file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
