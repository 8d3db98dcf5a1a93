//! Pack-file archive engine with an obfuscated fixed-size directory table
//!
//! A pack is a single container of `[payload region][32 MiB directory table
//! region]`. Members are addressed by a 64-bit hash of their normalized path
//! (case- and slash-insensitive), described by fixed 256-byte records, and
//! the table region is XOR-obfuscated as one block with a key baked into the
//! format. Replacing a member reuses its payload region in place when the new
//! content fits, and appends otherwise.

pub mod archive;
pub mod entry;
pub mod error;
pub mod hash;
pub mod obfuscate;
pub mod table;

pub use archive::PackArchive;
pub use entry::{DirEntry, EntryFlags, ENTRY_SIZE, NAME_CAP};
pub use error::{PackError, Result};
pub use hash::path_hash;
pub use obfuscate::PACK_KEY;
pub use table::{DirectoryTable, MAX_ENTRIES, TABLE_SIZE};
