//! Error types for pack archive operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive not found: {0}")]
    NotFound(PathBuf),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Corrupt directory table: {0}")]
    CorruptTable(String),

    #[error("Too many entries: {count} > {capacity}")]
    TooManyEntries { count: usize, capacity: usize },
}

pub type Result<T> = std::result::Result<T, PackError>;
