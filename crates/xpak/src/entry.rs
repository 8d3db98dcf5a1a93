//! Fixed-width directory record codec
//!
//! Every archive member is described by one 256-byte little-endian record:
//!
//! | offset | size | field       |
//! |--------|------|-------------|
//! | 0      | 8    | path_hash   |
//! | 8      | 8    | file_offset |
//! | 16     | 8    | file_size   |
//! | 24     | 1    | flags       |
//! | 25     | 1    | name_length |
//! | 26     | ≤240 | name        |
//!
//! A record whose `path_hash` is 0 is an unused slot; the table scan treats
//! it as the end-of-table sentinel. Unused name tail bytes are ignored on
//! decode and zeroed on encode.

use crate::error::{PackError, Result};
use crate::hash::{normalize_name, path_hash};
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;
use std::ops::BitOr;
use tracing::warn;

/// On-disk size of one directory record.
pub const ENTRY_SIZE: usize = 256;

/// Maximum stored name length in bytes. Longer names are truncated, not
/// rejected.
pub const NAME_CAP: usize = 240;

/// Per-entry flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryFlags(u8);

impl EntryFlags {
    pub const NONE: Self = Self(0);
    /// Entry is a directory marker; offset and size carry no payload.
    pub const DIRECTORY: Self = Self(0b0000_0001);
    /// Payload is XOR-obfuscated at rest.
    pub const ENCRYPTED: Self = Self(0b0000_0010);

    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_directory(self) -> bool {
        self.contains(Self::DIRECTORY)
    }

    pub fn is_encrypted(self) -> bool {
        self.contains(Self::ENCRYPTED)
    }
}

impl BitOr for EntryFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for EntryFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_directory(), self.is_encrypted()) {
            (true, true) => write!(f, "dir+enc"),
            (true, false) => write!(f, "dir"),
            (false, true) => write!(f, "enc"),
            (false, false) => write!(f, "file"),
        }
    }
}

/// One directory table record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// FNV-1a hash of the normalized path. Never 0 for a real entry.
    pub path_hash: u64,
    /// Absolute payload offset in the container. Meaningless for directories.
    pub file_offset: i64,
    /// Payload length in bytes; 0 for directories and empty files.
    pub file_size: i64,
    pub flags: EntryFlags,
    /// Slash-normalized path, case preserved, at most [`NAME_CAP`] bytes.
    pub name: String,
}

impl DirEntry {
    /// Build a file entry for `path`, normalizing the name and hashing it.
    pub fn file(path: &str, file_offset: i64, file_size: i64, flags: EntryFlags) -> Self {
        Self {
            path_hash: path_hash(path),
            file_offset,
            file_size,
            flags,
            name: capped_name(path),
        }
    }

    /// Build a directory marker entry for `path`.
    pub fn directory(path: &str) -> Self {
        Self {
            path_hash: path_hash(path),
            file_offset: 0,
            file_size: 0,
            flags: EntryFlags::DIRECTORY,
            name: capped_name(path),
        }
    }

    /// Encode into one fixed-size record. Unused name tail bytes are zero.
    pub fn encode(&self) -> [u8; ENTRY_SIZE] {
        let mut buf = [0u8; ENTRY_SIZE];
        LittleEndian::write_u64(&mut buf[0..8], self.path_hash);
        LittleEndian::write_i64(&mut buf[8..16], self.file_offset);
        LittleEndian::write_i64(&mut buf[16..24], self.file_size);
        buf[24] = self.flags.bits();

        let name = self.name.as_bytes();
        let len = name.len().min(NAME_CAP);
        buf[25] = len as u8;
        buf[26..26 + len].copy_from_slice(&name[..len]);
        buf
    }

    /// Decode one record. Returns `Ok(None)` for the zero-hash sentinel.
    pub fn decode(buf: &[u8; ENTRY_SIZE]) -> Result<Option<Self>> {
        let path_hash = LittleEndian::read_u64(&buf[0..8]);
        if path_hash == 0 {
            return Ok(None);
        }

        let file_offset = LittleEndian::read_i64(&buf[8..16]);
        let file_size = LittleEndian::read_i64(&buf[16..24]);
        let flags = EntryFlags::from_bits(buf[24]);
        let name_length = buf[25] as usize;

        if name_length > NAME_CAP {
            return Err(PackError::CorruptTable(format!(
                "name_length {name_length} exceeds {NAME_CAP} for hash {path_hash:016x}"
            )));
        }
        if file_size < 0 {
            return Err(PackError::CorruptTable(format!(
                "negative file_size {file_size} for hash {path_hash:016x}"
            )));
        }

        let name = String::from_utf8_lossy(&buf[26..26 + name_length]).into_owned();

        Ok(Some(Self {
            path_hash,
            file_offset,
            file_size,
            flags,
            name,
        }))
    }
}

/// Normalize a path for the name field and cap it at [`NAME_CAP`] bytes.
fn capped_name(path: &str) -> String {
    let mut name = normalize_name(path);
    if name.len() > NAME_CAP {
        warn!(
            "entry name exceeds {} bytes, truncating: {}",
            NAME_CAP, name
        );
        let mut cut = NAME_CAP;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        name.truncate(cut);
    }
    name
}
