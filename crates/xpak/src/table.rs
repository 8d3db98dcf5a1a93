//! In-memory directory table
//!
//! The on-disk table region is a fixed 32 MiB reservation of sequential
//! 256-byte records, terminated by the first zero-hash record. In memory the
//! table is an explicit capacity-bounded sequence of slots (insertion order
//! preserved, removed entries tombstoned) plus a hash index over the live
//! slots. Path lookups derive their key through [`path_hash`], so there is no
//! second path-keyed map to keep synchronized.

use crate::entry::{DirEntry, ENTRY_SIZE};
use crate::error::{PackError, Result};
use crate::hash::path_hash;
use std::collections::HashMap;
use tracing::debug;

/// Size of the reserved on-disk table region.
pub const TABLE_SIZE: usize = 0x0200_0000; // 32 MiB

/// Maximum number of records the table region can hold.
pub const MAX_ENTRIES: usize = TABLE_SIZE / ENTRY_SIZE; // 131072

#[derive(Debug, Default)]
pub struct DirectoryTable {
    /// Insertion-ordered slots; `None` marks a removed entry.
    slots: Vec<Option<DirEntry>>,
    /// Live entries by path hash, indexing into `slots`.
    by_hash: HashMap<u64, usize>,
}

impl DirectoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table by scanning a de-obfuscated table region.
    ///
    /// Scanning stops at the first zero-hash record or after [`MAX_ENTRIES`]
    /// records. A duplicate hash before the sentinel is data corruption.
    pub fn from_region(region: &[u8]) -> Result<Self> {
        let mut table = Self::new();

        for chunk in region.chunks_exact(ENTRY_SIZE).take(MAX_ENTRIES) {
            // chunks_exact yields exactly ENTRY_SIZE bytes per chunk.
            let mut record = [0u8; ENTRY_SIZE];
            record.copy_from_slice(chunk);
            let Some(entry) = DirEntry::decode(&record)? else {
                break;
            };

            if table.by_hash.contains_key(&entry.path_hash) {
                return Err(PackError::CorruptTable(format!(
                    "duplicate hash {:016x} for {}",
                    entry.path_hash, entry.name
                )));
            }
            table.insert_slot(entry);
        }

        debug!("scanned directory table: {} entries", table.len());
        Ok(table)
    }

    /// Serialize all entries in ascending-hash order into a full table
    /// region. Fails before producing any bytes if the table exceeds
    /// capacity; a truncated table is never emitted.
    pub fn write_region(&self) -> Result<Vec<u8>> {
        let count = self.len();
        if count > MAX_ENTRIES {
            return Err(PackError::TooManyEntries {
                count,
                capacity: MAX_ENTRIES,
            });
        }

        let mut region = vec![0u8; TABLE_SIZE];
        for (i, entry) in self.iter_sorted_by_hash().into_iter().enumerate() {
            region[i * ENTRY_SIZE..(i + 1) * ENTRY_SIZE].copy_from_slice(&entry.encode());
        }
        Ok(region)
    }

    pub fn get_by_hash(&self, hash: u64) -> Option<&DirEntry> {
        let idx = *self.by_hash.get(&hash)?;
        self.slots[idx].as_ref()
    }

    pub fn get_by_path(&self, path: &str) -> Option<&DirEntry> {
        self.get_by_hash(path_hash(path))
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.get_by_path(path).is_some()
    }

    /// Insert or replace the entry for its hash. A replace reuses the
    /// original slot, so insertion order (and offset tie-breaking) is stable.
    pub fn upsert(&mut self, entry: DirEntry) {
        if let Some(&idx) = self.by_hash.get(&entry.path_hash) {
            self.slots[idx] = Some(entry);
        } else {
            self.insert_slot(entry);
        }
    }

    pub fn remove(&mut self, hash: u64) -> Option<DirEntry> {
        let idx = self.by_hash.remove(&hash)?;
        self.slots[idx].take()
    }

    /// Live entries in ascending payload offset order; equal offsets keep
    /// insertion order.
    pub fn iter_by_offset(&self) -> Vec<&DirEntry> {
        let mut entries: Vec<&DirEntry> = self.slots.iter().flatten().collect();
        entries.sort_by_key(|e| e.file_offset);
        entries
    }

    /// Live entries in ascending hash order, the canonical persisted order.
    pub fn iter_sorted_by_hash(&self) -> Vec<&DirEntry> {
        let mut entries: Vec<&DirEntry> = self.slots.iter().flatten().collect();
        entries.sort_by_key(|e| e.path_hash);
        entries
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    fn insert_slot(&mut self, entry: DirEntry) {
        self.by_hash.insert(entry.path_hash, self.slots.len());
        self.slots.push(Some(entry));
    }
}
