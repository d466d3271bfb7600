use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::entry::{check_name_length, Access, StorageType, ENTRY_LENGTH};
use super::error::DecodeError;
use super::fields::{decode_name, read_timestamp, read_u16};
use crate::image::BLOCK_SIZE;

/// Prev/next block pointers at the start of every directory block.
pub const DIRECTORY_LINK_SIZE: usize = 4;

/// Which header a directory key block is expected to start with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderKind {
    Volume,
    Subdirectory,
}

impl HeaderKind {
    fn storage_type(self) -> StorageType {
        match self {
            HeaderKind::Volume => StorageType::VolumeHeader,
            HeaderKind::Subdirectory => StorageType::SubdirectoryHeader,
        }
    }
}

impl fmt::Display for HeaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderKind::Volume => write!(f, "volume directory"),
            HeaderKind::Subdirectory => write!(f, "subdirectory"),
        }
    }
}

/// Fields that differ between the volume and subdirectory header forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeaderLinks {
    Volume {
        bitmap_pointer: u16,
        total_blocks: u16,
    },
    Subdirectory {
        /// Directory block holding this subdirectory's entry.
        parent_pointer: u16,
        parent_entry_number: u8,
        parent_entry_length: u8,
    },
}

/// Decoded slot 0 of a directory key block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryHeader {
    pub name: String,
    pub created: Option<NaiveDateTime>,
    pub version: u8,
    pub min_version: u8,
    pub access: Access,
    pub entry_length: u8,
    pub entries_per_block: u8,
    /// Active entries the directory claims to hold.
    pub file_count: u16,
    pub links: HeaderLinks,
}

impl DirectoryHeader {
    pub fn kind(&self) -> HeaderKind {
        match self.links {
            HeaderLinks::Volume { .. } => HeaderKind::Volume,
            HeaderLinks::Subdirectory { .. } => HeaderKind::Subdirectory,
        }
    }

    /// Declared volume size; `None` for subdirectory headers.
    pub fn total_blocks(&self) -> Option<u16> {
        match self.links {
            HeaderLinks::Volume { total_blocks, .. } => Some(total_blocks),
            HeaderLinks::Subdirectory { .. } => None,
        }
    }

    /// Byte offset of entry `slot` within a directory block.
    pub fn slot_offset(&self, slot: usize) -> usize {
        DIRECTORY_LINK_SIZE + slot * self.entry_length as usize
    }
}

/// A header plus its field-level problems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHeader {
    pub header: DirectoryHeader,
    pub warnings: Vec<DecodeError>,
}

fn check_geometry(entry_length: u8, entries_per_block: u8) -> Result<(), DecodeError> {
    let fits = entry_length as usize >= ENTRY_LENGTH
        && entries_per_block >= 1
        && DIRECTORY_LINK_SIZE + entry_length as usize * entries_per_block as usize <= BLOCK_SIZE;
    if !fits {
        return Err(DecodeError::InvalidGeometry {
            entry_length,
            entries_per_block,
        });
    }
    Ok(())
}

/// Decode the header record at slot 0 of a directory key block.
///
/// Fails when the tag does not match `expected` or when the declared entry
/// geometry cannot fit a block; bad names and timestamps are warnings.
pub fn decode_header(raw: &[u8], expected: HeaderKind) -> Result<DecodedHeader, DecodeError> {
    if raw.len() < ENTRY_LENGTH {
        return Err(DecodeError::EntryTooShort { len: raw.len() });
    }

    let storage_nibble = raw[0] >> 4;
    if StorageType::from_nibble(storage_nibble) != expected.storage_type() {
        return Err(DecodeError::HeaderKindMismatch {
            expected,
            found: storage_nibble,
        });
    }

    let entry_length = raw[31];
    let entries_per_block = raw[32];
    check_geometry(entry_length, entries_per_block)?;

    let mut warnings = Vec::new();
    let name_length = raw[0] & 0xF;
    if let Err(e) = check_name_length(name_length) {
        warnings.push(e);
    }
    let created = read_timestamp(raw, 24).unwrap_or_else(|e| {
        warnings.push(e);
        None
    });

    let links = match expected {
        HeaderKind::Volume => HeaderLinks::Volume {
            bitmap_pointer: read_u16(raw, 35),
            total_blocks: read_u16(raw, 37),
        },
        HeaderKind::Subdirectory => HeaderLinks::Subdirectory {
            parent_pointer: read_u16(raw, 35),
            parent_entry_number: raw[37],
            parent_entry_length: raw[38],
        },
    };

    let header = DirectoryHeader {
        name: decode_name(&raw[1..16], name_length as usize),
        created,
        version: raw[28],
        min_version: raw[29],
        access: Access(raw[30]),
        entry_length,
        entries_per_block,
        file_count: read_u16(raw, 33),
        links,
    };
    Ok(DecodedHeader { header, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Volume header "BLANK", 280 blocks, bitmap at block 6, 3 files.
    fn make_volume_header() -> [u8; ENTRY_LENGTH] {
        let mut h = [0u8; ENTRY_LENGTH];
        h[0] = 0xF5;
        h[1..6].copy_from_slice(b"BLANK");
        h[30] = 0xC3;
        h[31] = 39;
        h[32] = 13;
        h[33] = 3;
        h[35] = 6;
        h[37..39].copy_from_slice(&280u16.to_le_bytes());
        h
    }

    #[test]
    fn test_decode_volume_header() {
        let decoded = decode_header(&make_volume_header(), HeaderKind::Volume).unwrap();
        assert!(decoded.warnings.is_empty());
        let h = decoded.header;
        assert_eq!(h.name, "BLANK");
        assert_eq!(h.kind(), HeaderKind::Volume);
        assert_eq!(h.entry_length, 39);
        assert_eq!(h.entries_per_block, 13);
        assert_eq!(h.file_count, 3);
        assert_eq!(h.total_blocks(), Some(280));
        assert_eq!(
            h.links,
            HeaderLinks::Volume {
                bitmap_pointer: 6,
                total_blocks: 280
            }
        );
        assert_eq!(h.slot_offset(1), 43);
    }

    #[test]
    fn test_decode_subdirectory_header() {
        let mut raw = make_volume_header();
        raw[0] = 0xE6;
        raw[1..7].copy_from_slice(b"SUBDIR");
        raw[35..37].copy_from_slice(&2u16.to_le_bytes());
        raw[37] = 4;
        raw[38] = 39;
        let h = decode_header(&raw, HeaderKind::Subdirectory)
            .unwrap()
            .header;
        assert_eq!(h.name, "SUBDIR");
        assert_eq!(h.total_blocks(), None);
        assert_eq!(
            h.links,
            HeaderLinks::Subdirectory {
                parent_pointer: 2,
                parent_entry_number: 4,
                parent_entry_length: 39
            }
        );
    }

    #[test]
    fn test_header_kind_mismatch() {
        assert_eq!(
            decode_header(&make_volume_header(), HeaderKind::Subdirectory),
            Err(DecodeError::HeaderKindMismatch {
                expected: HeaderKind::Subdirectory,
                found: 0xF
            })
        );

        let mut raw = make_volume_header();
        raw[0] = 0x15; // a seedling file entry, not a header
        assert!(matches!(
            decode_header(&raw, HeaderKind::Volume),
            Err(DecodeError::HeaderKindMismatch { found: 0x1, .. })
        ));
    }

    #[test]
    fn test_geometry_checked() {
        let mut raw = make_volume_header();
        raw[32] = 14; // 4 + 39 * 14 = 550 > 512
        assert_eq!(
            decode_header(&raw, HeaderKind::Volume),
            Err(DecodeError::InvalidGeometry {
                entry_length: 39,
                entries_per_block: 14
            })
        );

        raw[31] = 20;
        raw[32] = 13;
        assert!(decode_header(&raw, HeaderKind::Volume).is_err());

        raw[31] = 39;
        raw[32] = 0;
        assert!(decode_header(&raw, HeaderKind::Volume).is_err());

        // a wider record with fewer slots still fits
        raw[31] = 50;
        raw[32] = 10;
        assert!(decode_header(&raw, HeaderKind::Volume).is_ok());
    }

    #[test]
    fn test_empty_volume_name_is_a_warning() {
        let mut raw = make_volume_header();
        raw[0] = 0xF0;
        let decoded = decode_header(&raw, HeaderKind::Volume).unwrap();
        assert_eq!(decoded.header.name, "");
        assert_eq!(
            decoded.warnings,
            vec![DecodeError::InvalidNameLength { length: 0 }]
        );
    }
}
