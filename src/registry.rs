//! Immutable per-run snapshots.
//!
//! The partner list, the filetype vocabulary and the recorded fileset are
//! loaded once from the [`Store`](crate::store::Store) at the start of a run
//! and passed by reference to every component. Nothing mutates them while
//! the run is in progress.

use std::collections::BTreeMap;

use crate::models::{FilesetEntry, Filetype, Partner, PartnerId};

/// Partners in a stable order (ascending id), with lookup by id.
#[derive(Debug, Clone, Default)]
pub struct PartnerRegistry {
    partners: Vec<Partner>,
}

impl PartnerRegistry {
    pub fn new(mut partners: Vec<Partner>) -> Self {
        partners.sort_by_key(|p| p.id);
        Self { partners }
    }

    pub fn get(&self, id: PartnerId) -> Option<&Partner> {
        self.partners
            .binary_search_by_key(&id, |p| p.id)
            .ok()
            .map(|idx| &self.partners[idx])
    }

    /// Display name for `id`, falling back to the bare id for partners
    /// removed from the store after a run was recorded.
    pub fn display_name(&self, id: PartnerId) -> String {
        self.get(id)
            .map(|p| p.full_name.clone())
            .unwrap_or_else(|| format!("partner #{}", id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Partner> {
        self.partners.iter()
    }

    pub fn len(&self) -> usize {
        self.partners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }
}

/// The controlled vocabulary of known filetype names, upper-cased.
#[derive(Debug, Clone, Default)]
pub struct FiletypeVocabulary {
    entries: Vec<Filetype>,
}

impl FiletypeVocabulary {
    pub fn new(filetypes: Vec<Filetype>) -> Self {
        let mut entries: Vec<Filetype> = filetypes
            .into_iter()
            .map(|ft| Filetype {
                id: ft.id,
                name: ft.name.to_uppercase(),
            })
            .collect();
        entries.sort_by_key(|ft| ft.id);
        Self { entries }
    }

    /// Exact lookup; `name` must already be upper-cased.
    pub fn exact(&self, name: &str) -> Option<&Filetype> {
        self.entries.iter().find(|ft| ft.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Filetype> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Recorded fileset entries grouped by partner, in recorded order.
#[derive(Debug, Clone, Default)]
pub struct FilesetSnapshot {
    by_partner: BTreeMap<PartnerId, Vec<FilesetEntry>>,
}

impl FilesetSnapshot {
    pub fn new(entries: Vec<FilesetEntry>) -> Self {
        let mut by_partner: BTreeMap<PartnerId, Vec<FilesetEntry>> = BTreeMap::new();
        for entry in entries {
            by_partner.entry(entry.partner_id).or_default().push(entry);
        }
        Self { by_partner }
    }

    pub fn for_partner(&self, id: PartnerId) -> &[FilesetEntry] {
        self.by_partner.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_partner.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
