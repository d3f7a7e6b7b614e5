//! Partner availability classification.
//!
//! Decides, per partner, whether the watch directory has anything worth
//! looking at. Only [`PartnerStatus::HasNewFiles`] partners go on to the
//! fileset matcher.

use std::path::Path;

use tracing::{debug, error, info};

use crate::models::{Partner, PartnerStatus};

/// Classify one partner. Disabled partners are never inspected.
pub fn classify_partner(partner: &Partner) -> PartnerStatus {
    if !partner.enabled {
        info!(partner = %partner.full_name, "partner is set to not be checked");
        return PartnerStatus::NotChecked;
    }
    info!(partner = %partner.full_name, "checking watch directory");
    let status = classify_directory(&partner.directory);
    if status == PartnerStatus::DirectoryNotFound {
        error!(
            partner = %partner.full_name,
            directory = %partner.directory.display(),
            "watch directory not found"
        );
    }
    status
}

/// Classify a watch directory by its immediate entries.
///
/// Missing or unreadable directories are `DirectoryNotFound`; an empty
/// directory, or one holding only subdirectories, is `NoNewData`; at least
/// one regular file (symlinks followed) is `HasNewFiles`.
pub fn classify_directory(dir: &Path) -> PartnerStatus {
    if !dir.is_dir() {
        return PartnerStatus::DirectoryNotFound;
    }
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            error!(directory = %dir.display(), error = %e, "cannot list watch directory");
            return PartnerStatus::DirectoryNotFound;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            debug!(file = %path.display(), "found regular file");
            return PartnerStatus::HasNewFiles;
        }
    }
    PartnerStatus::NoNewData
}
