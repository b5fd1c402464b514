//! JSON persistence for a whole catalog of entries.
//!
//! The catalog file is a JSON array of [`CatalogEntry`] records ordered by
//! id. Writes go through a temp file and a rename so a crash never leaves a
//! half-written catalog behind.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use thiserror::Error;

use crate::types::CatalogEntry;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

/// All known entries, keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entries: BTreeMap<u32, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog file. A missing file yields an empty catalog.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            log::debug!("No catalog at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| StoreError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let entries: Vec<CatalogEntry> =
            serde_json::from_str(&contents).map_err(|e| StoreError::Json {
                path: path.display().to_string(),
                source: e,
            })?;

        let mut catalog = Self::new();
        for entry in entries {
            catalog.merge_entry(entry);
        }
        log::debug!("Loaded {} entries from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Write the catalog as pretty JSON, atomically.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let io_err = |e| StoreError::Io {
            path: path.display().to_string(),
            source: e,
        };

        let entries: Vec<&CatalogEntry> = self.entries.values().collect();
        let serialized =
            serde_json::to_string_pretty(&entries).map_err(|e| StoreError::Json {
                path: path.display().to_string(),
                source: e,
            })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serialized).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&CatalogEntry> {
        self.entries.get(&id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    /// Mutable access to the entry for `id`, creating a bare one if needed.
    pub fn entry_mut_or_insert(&mut self, id: u32) -> &mut CatalogEntry {
        self.entries
            .entry(id)
            .or_insert_with(|| CatalogEntry::new(id))
    }

    /// Copies of the stored entries for `ids`, in order, with a bare entry for
    /// each id not in the catalog. Repeated ids are listed once.
    pub fn entries_for(&self, ids: &[u32]) -> Vec<CatalogEntry> {
        let mut seen = BTreeSet::new();
        ids.iter()
            .filter(|&&id| seen.insert(id))
            .map(|&id| self.get(id).cloned().unwrap_or_else(|| CatalogEntry::new(id)))
            .collect()
    }

    /// Store `entry` as is, replacing any entry with the same id.
    pub fn insert(&mut self, entry: CatalogEntry) -> Option<CatalogEntry> {
        self.entries.insert(entry.id(), entry)
    }

    /// Insert `entry`, or merge it into the stored entry with the same id.
    ///
    /// Returns the stored entry after the merge.
    pub fn merge_entry(&mut self, entry: CatalogEntry) -> &CatalogEntry {
        match self.entries.entry(entry.id()) {
            std::collections::btree_map::Entry::Vacant(slot) => slot.insert(entry),
            std::collections::btree_map::Entry::Occupied(slot) => {
                let stored = slot.into_mut();
                stored.merge(&entry);
                stored
            }
        }
    }
}
