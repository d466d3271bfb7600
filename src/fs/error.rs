use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::entry::StorageType;
use super::header::HeaderKind;
use crate::image::BlockError;

/// Everything that can go wrong while decoding a volume's directory tree.
///
/// Structural variants stop the subtree they occur in; field-level variants
/// (`InvalidNameLength`, `UnknownStorageType`, `FileTypeMismatch`,
/// `InvalidTimestamp`) only tag the
/// entry they were found on; the mismatch variants are informational.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeError {
    #[error("block {block} is outside the image ({block_count} blocks)")]
    BlockOutOfRange { block: u32, block_count: u32 },

    #[error("failed to read block {block}: {reason}")]
    BlockRead { block: u32, reason: String },

    #[error("expected a {expected} header, found storage type ${found:X}")]
    HeaderKindMismatch { expected: HeaderKind, found: u8 },

    #[error("{entries_per_block} entries of {entry_length} bytes do not fit a directory block")]
    InvalidGeometry {
        entry_length: u8,
        entries_per_block: u8,
    },

    #[error("entry record is {len} bytes, need 39")]
    EntryTooShort { len: usize },

    #[error("invalid name length {length}")]
    InvalidNameLength { length: u8 },

    #[error("unknown storage type ${storage_type:X}")]
    UnknownStorageType { storage_type: u8 },

    #[error("{storage_type} entry has file type ${file_type:02X}")]
    FileTypeMismatch {
        storage_type: StorageType,
        file_type: u8,
    },

    #[error("invalid timestamp (date ${date:04X}, time ${time:04X})")]
    InvalidTimestamp { date: u16, time: u16 },

    #[error("directory block {block} is linked more than once")]
    DirectoryCycle { block: u32 },

    #[error("directories nested deeper than {limit} levels")]
    DepthLimitExceeded { limit: usize },

    #[error("header declares {declared} active entries, found {found}")]
    FileCountMismatch { declared: u16, found: usize },

    #[error("volume declares {declared} blocks, image holds {actual}")]
    VolumeSizeMismatch { declared: u16, actual: u32 },
}

impl From<BlockError> for DecodeError {
    fn from(e: BlockError) -> Self {
        match e {
            BlockError::OutOfRange { index, block_count } => DecodeError::BlockOutOfRange {
                block: index,
                block_count,
            },
            BlockError::Io { index, source } => DecodeError::BlockRead {
                block: index,
                reason: source.to_string(),
            },
        }
    }
}

/// A decode problem together with where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Path of the directory (or subdirectory entry) the problem belongs to.
    pub path: String,
    pub block: Option<u32>,
    /// Entry slot within `block`; slot 0 of a key block is the header.
    pub slot: Option<usize>,
    pub error: DecodeError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{path}")?;
        if let Some(block) = self.block {
            write!(f, " (block {block}")?;
            if let Some(slot) = self.slot {
                write!(f, ", slot {slot}")?;
            }
            write!(f, ")")?;
        }
        write!(f, ": {}", self.error)
    }
}
