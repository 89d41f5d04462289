//! Append-only, index-deduplicated ledgers

use crate::journal::atomic::{read_json, write_json_atomic};
use crate::journal::entries::LedgerEntry;
use crate::journal::error::PersistResult;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// A JSON array of entries, at most one per record index
///
/// Each successful append rewrites the whole file atomically, so the file on
/// disk always holds a complete, parseable array.
#[derive(Debug)]
pub struct Ledger<T> {
    path: PathBuf,
    what: &'static str,
    entries: Vec<T>,
    indices: BTreeSet<usize>,
}

impl<T: LedgerEntry> Ledger<T> {
    /// Opens the ledger at `path`, starting empty when absent
    ///
    /// Duplicate indices in an existing file keep their first occurrence.
    pub fn open(path: &Path, what: &'static str) -> PersistResult<Self> {
        let loaded: Vec<T> = read_json(path)?.unwrap_or_default();

        let mut indices = BTreeSet::new();
        let entries: Vec<T> = loaded
            .into_iter()
            .filter(|entry| indices.insert(entry.index()))
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            what,
            entries,
            indices,
        })
    }

    /// Appends `entry` unless its index is already present
    ///
    /// Returns whether the entry was written. On a write failure the
    /// in-memory view is left unchanged.
    pub fn append(&mut self, entry: T) -> PersistResult<bool> {
        let index = entry.index();
        if self.indices.contains(&index) {
            return Ok(false);
        }

        self.entries.push(entry);
        if let Err(e) = write_json_atomic(&self.path, &self.entries, self.what) {
            self.entries.pop();
            return Err(e);
        }

        self.indices.insert(index);
        Ok(true)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        if !self.contains(index) {
            return None;
        }
        self.entries.iter().find(|e| e.index() == index)
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
