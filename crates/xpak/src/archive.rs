//! Archive I/O engine
//!
//! One [`PackArchive`] handle owns one read/write file and its in-memory
//! directory table. The container layout is `[payload region][table region]`,
//! with the 32 MiB table region obfuscated as a single block at the tail.
//!
//! The handle is single-threaded and synchronous. Mutations edit the table in
//! memory; nothing is persisted until [`PackArchive::finalize`], which
//! consumes the handle so the table is committed exactly once. Dropping the
//! handle without finalizing closes the file and discards pending table
//! edits.

use crate::entry::{DirEntry, EntryFlags};
use crate::error::{PackError, Result};
use crate::obfuscate::{self, PACK_KEY};
use crate::table::{DirectoryTable, TABLE_SIZE};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct PackArchive {
    file: File,
    path: PathBuf,
    table: DirectoryTable,
    /// Where the next appended payload lands. On a freshly opened archive
    /// this is the payload/table boundary.
    cursor: u64,
    /// Start of the table region as it currently exists on disk, if any.
    table_offset: Option<u64>,
    /// Pooled payload buffer reused across reads.
    scratch: Vec<u8>,
}

impl PackArchive {
    /// Open an existing pack for reading and writing.
    ///
    /// Reads and de-obfuscates the trailing table region, builds the
    /// directory table, and validates every payload extent against the data
    /// region. The write cursor starts at the payload/table boundary.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => PackError::NotFound(path.clone()),
                _ => PackError::Io(e),
            })?;

        let len = file.metadata()?.len();
        if len < TABLE_SIZE as u64 {
            return Err(PackError::CorruptTable(format!(
                "container too short for table region: {len} bytes"
            )));
        }
        let table_offset = len - TABLE_SIZE as u64;

        file.seek(SeekFrom::Start(table_offset))?;
        let mut region = vec![0u8; TABLE_SIZE];
        file.read_exact(&mut region)?;
        obfuscate::apply(&mut region, PACK_KEY);

        let table = DirectoryTable::from_region(&region)?;
        validate_extents(&table, table_offset)?;

        file.seek(SeekFrom::Start(table_offset))?;
        debug!(
            "opened pack {:?}: {} entries, payload region {} bytes",
            path,
            table.len(),
            table_offset
        );

        Ok(Self {
            file,
            path,
            table,
            cursor: table_offset,
            table_offset: Some(table_offset),
            scratch: Vec::new(),
        })
    }

    /// Create a new, empty pack, truncating any existing file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        debug!("created pack {:?}", path);

        Ok(Self {
            file,
            path,
            table: DirectoryTable::new(),
            cursor: 0,
            table_offset: None,
            scratch: Vec::new(),
        })
    }

    /// Path of the underlying container.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries in ascending hash order, the canonical persisted order.
    pub fn entries(&self) -> Vec<&DirEntry> {
        self.table.iter_sorted_by_hash()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Whether `path` names a member, under the usual case and slash
    /// insensitivity.
    pub fn exists(&self, path: &str) -> bool {
        self.table.contains_path(path)
    }

    /// Extract one member by name. Returns `false` if the pack has no such
    /// member.
    pub fn extract_one(&mut self, path: &str, dest: &Path) -> Result<bool> {
        let Some(entry) = self.table.get_by_path(path).cloned() else {
            warn!("no such entry: {path}");
            return Ok(false);
        };
        self.extract_entry(&entry, dest)?;
        Ok(true)
    }

    /// Extract every member under `dest_dir`, in ascending payload offset
    /// order. Each entry creates its own parent directories, so no
    /// directory-before-file ordering is needed across entries.
    pub fn extract_all(&mut self, dest_dir: &Path) -> Result<()> {
        let entries: Vec<DirEntry> = self
            .table
            .iter_by_offset()
            .into_iter()
            .cloned()
            .collect();

        info!("extracting {} entries to {:?}", entries.len(), dest_dir);
        for entry in &entries {
            let dest = dest_dir.join(native_path(&entry.name));
            self.extract_entry(entry, &dest)?;
        }
        Ok(())
    }

    /// Add a new file or replace an existing one.
    ///
    /// New paths append at the write cursor. Replacements first attempt a
    /// best-effort backup of the old content into `backup_dir` (failure is
    /// logged, never fatal), then reuse the old payload region in place when
    /// the new content fits, or append when it has grown. The entry's hash
    /// and name are unchanged on replace; an `ENCRYPTED` entry's new payload
    /// is obfuscated before it is written.
    pub fn add_file(&mut self, path: &str, content: &[u8], backup_dir: Option<&Path>) -> Result<()> {
        let new_size = content.len() as i64;

        let Some(old) = self.table.get_by_path(path).cloned() else {
            let offset = self.cursor;
            let entry = DirEntry::file(path, offset as i64, new_size, EntryFlags::NONE);
            self.write_payload(offset, content, entry.flags)?;
            self.cursor += content.len() as u64;
            debug!("added {} ({} bytes at offset {})", entry.name, new_size, offset);
            self.table.upsert(entry);
            return Ok(());
        };

        if let Some(dir) = backup_dir {
            let backup_dest = dir.join(native_path(&old.name));
            if let Err(e) = self.extract_entry(&old, &backup_dest) {
                warn!("backup of {} failed, continuing with replace: {}", old.name, e);
            }
        }

        // A directory marker replaced by file content loses its marker flag;
        // its zero size always routes the new content through the append arm.
        let flags = if old.flags.is_directory() {
            EntryFlags::NONE
        } else {
            old.flags
        };

        let mut entry = old.clone();
        entry.flags = flags;
        entry.file_size = new_size;

        if !old.flags.is_directory() && new_size <= old.file_size {
            // Reuse in place: clear the old region, write at the old offset,
            // and leave the append cursor where it was.
            let old_offset = old.file_offset as u64;
            self.file.seek(SeekFrom::Start(old_offset))?;
            self.file.write_all(&vec![0u8; old.file_size as usize])?;
            self.write_payload(old_offset, content, flags)?;
            entry.file_offset = old.file_offset;
            debug!(
                "replaced {} in place at offset {} ({} -> {} bytes)",
                entry.name, old.file_offset, old.file_size, new_size
            );
        } else {
            let offset = self.cursor;
            self.write_payload(offset, content, flags)?;
            self.cursor += content.len() as u64;
            entry.file_offset = offset as i64;
            debug!(
                "replaced {} by append at offset {} ({} -> {} bytes)",
                entry.name, offset, old.file_size, new_size
            );
        }

        self.table.upsert(entry);
        Ok(())
    }

    /// Insert a directory marker. Re-adding an existing directory is a
    /// logged no-op.
    pub fn add_directory(&mut self, path: &str) -> Result<()> {
        if let Some(existing) = self.table.get_by_path(path) {
            if existing.flags.is_directory() {
                debug!("directory {} already present", existing.name);
            } else {
                warn!("{} already exists as a file, not adding directory marker", existing.name);
            }
            return Ok(());
        }

        let entry = DirEntry::directory(path);
        debug!("added directory {}", entry.name);
        self.table.upsert(entry);
        Ok(())
    }

    /// Serialize, obfuscate, and write the directory table, consuming the
    /// handle.
    ///
    /// The table lands at its existing on-disk offset when `overwrite_table`
    /// holds and no payload write has advanced the cursor past it; otherwise
    /// it is appended at the cursor. A table past capacity aborts with
    /// [`PackError::TooManyEntries`] before any bytes reach disk.
    pub fn finalize(mut self, overwrite_table: bool) -> Result<()> {
        let mut region = self.table.write_region()?;
        obfuscate::apply(&mut region, PACK_KEY);

        let target = match self.table_offset {
            Some(t) if overwrite_table && self.cursor <= t => t,
            _ => self.cursor,
        };

        self.file.seek(SeekFrom::Start(target))?;
        self.file.write_all(&region)?;
        self.file.set_len(target + TABLE_SIZE as u64)?;
        self.file.sync_all()?;

        info!(
            "finalized {:?}: {} entries, table at offset {}",
            self.path,
            self.table.len(),
            target
        );
        Ok(())
    }

    fn extract_entry(&mut self, entry: &DirEntry, dest: &Path) -> Result<()> {
        if entry.flags.is_directory() {
            fs::create_dir_all(dest)?;
            return Ok(());
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let size = entry.file_size as usize;
        self.scratch.resize(size, 0);
        self.file.seek(SeekFrom::Start(entry.file_offset as u64))?;
        self.file.read_exact(&mut self.scratch)?;
        if entry.flags.is_encrypted() {
            obfuscate::apply(&mut self.scratch, PACK_KEY);
        }

        fs::write(dest, &self.scratch)?;
        debug!("extracted {} ({} bytes) to {:?}", entry.name, size, dest);
        Ok(())
    }

    fn write_payload(&mut self, offset: u64, content: &[u8], flags: EntryFlags) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        if flags.is_encrypted() {
            let mut buf = content.to_vec();
            obfuscate::apply(&mut buf, PACK_KEY);
            self.file.write_all(&buf)?;
        } else {
            self.file.write_all(content)?;
        }
        Ok(())
    }
}

/// Reject tables whose payload extents fall outside the data region.
fn validate_extents(table: &DirectoryTable, payload_len: u64) -> Result<()> {
    for entry in table.iter_by_offset() {
        if entry.flags.is_directory() {
            continue;
        }
        let end = entry
            .file_offset
            .checked_add(entry.file_size)
            .filter(|end| entry.file_offset >= 0 && *end as u64 <= payload_len);
        if end.is_none() {
            return Err(PackError::CorruptTable(format!(
                "payload extent [{}, +{}) of {} outside data region of {} bytes",
                entry.file_offset, entry.file_size, entry.name, payload_len
            )));
        }
    }
    Ok(())
}

/// Turn a stored backslash name into a platform-native relative path.
fn native_path(name: &str) -> PathBuf {
    name.split('\\').filter(|s| !s.is_empty()).collect()
}
