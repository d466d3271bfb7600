use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::error::DecodeError;
use super::fields::{apply_case_flags, decode_name, read_timestamp, read_u16, read_u24};

/// Bytes of a directory record that carry data. Headers may declare a longer
/// entry length; the tail is ignored.
pub const ENTRY_LENGTH: usize = 39;

pub const MAX_NAME_LENGTH: u8 = 15;

// ─────────────────────────────── storage type ────────────────────────────────

/// High nibble of the first byte of every directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    Deleted,
    /// Data fits in the key block.
    Seedling,
    /// Key block is an index block of data blocks.
    Sapling,
    /// Key block is a master index of index blocks.
    Tree,
    /// Apple II Pascal area (ProDOS Technical Note #25).
    PascalArea,
    /// GS/OS file with data and resource forks.
    Extended,
    Subdirectory,
    SubdirectoryHeader,
    VolumeHeader,
    Unknown(u8),
}

impl StorageType {
    pub fn from_nibble(nibble: u8) -> Self {
        match nibble & 0xF {
            0x0 => StorageType::Deleted,
            0x1 => StorageType::Seedling,
            0x2 => StorageType::Sapling,
            0x3 => StorageType::Tree,
            0x4 => StorageType::PascalArea,
            0x5 => StorageType::Extended,
            0xD => StorageType::Subdirectory,
            0xE => StorageType::SubdirectoryHeader,
            0xF => StorageType::VolumeHeader,
            other => StorageType::Unknown(other),
        }
    }

    pub fn nibble(self) -> u8 {
        match self {
            StorageType::Deleted => 0x0,
            StorageType::Seedling => 0x1,
            StorageType::Sapling => 0x2,
            StorageType::Tree => 0x3,
            StorageType::PascalArea => 0x4,
            StorageType::Extended => 0x5,
            StorageType::Subdirectory => 0xD,
            StorageType::SubdirectoryHeader => 0xE,
            StorageType::VolumeHeader => 0xF,
            StorageType::Unknown(n) => n,
        }
    }

    /// Storage types whose entries describe file data (and carry an aux type).
    pub fn is_file(self) -> bool {
        matches!(
            self,
            StorageType::Seedling
                | StorageType::Sapling
                | StorageType::Tree
                | StorageType::PascalArea
                | StorageType::Extended
        )
    }

    /// Legal in an entry slot (anything but the two header tags and unknowns).
    fn is_entry_type(self) -> bool {
        self == StorageType::Deleted || self == StorageType::Subdirectory || self.is_file()
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::Deleted => write!(f, "deleted"),
            StorageType::Seedling => write!(f, "seedling"),
            StorageType::Sapling => write!(f, "sapling"),
            StorageType::Tree => write!(f, "tree"),
            StorageType::PascalArea => write!(f, "pascal area"),
            StorageType::Extended => write!(f, "extended"),
            StorageType::Subdirectory => write!(f, "subdirectory"),
            StorageType::SubdirectoryHeader => write!(f, "subdirectory header"),
            StorageType::VolumeHeader => write!(f, "volume header"),
            StorageType::Unknown(n) => write!(f, "${n:X}"),
        }
    }
}

// ─────────────────────────────── file type ───────────────────────────────────

/// Raw file type byte. Values are kept verbatim; [`FileType::mnemonic`] is only
/// a display aid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FileType(pub u8);

impl FileType {
    pub const DIRECTORY: FileType = FileType(0x0F);

    /// Three-letter mnemonic from the SOS and ProDOS file type tables.
    pub fn mnemonic(self) -> Option<&'static str> {
        let name = match self.0 {
            0x00 => "NON",
            0x01 => "BAD",
            0x02 => "PCD",
            0x03 => "PTX",
            0x04 => "TXT",
            0x05 => "PDA",
            0x06 => "BIN",
            0x07 => "FNT",
            0x08 => "FOT",
            0x09 => "BA3",
            0x0A => "DA3",
            0x0B => "WPF",
            0x0C => "SOS",
            0x0F => "DIR",
            0x10 => "RPD",
            0x11 => "RPI",
            0x12 => "AFD",
            0x13 => "AFM",
            0x14 => "AFR",
            0x15 => "SCL",
            0x19 => "ADB",
            0x1A => "AWP",
            0x1B => "ASP",
            0xB0 => "SRC",
            0xB3 => "S16",
            0xB4 => "RTL",
            0xB5 => "EXE",
            0xB6 => "PIF",
            0xB7 => "TIF",
            0xB8 => "NDA",
            0xB9 => "CDA",
            0xBA => "TOL",
            0xBB => "DVR",
            0xBC => "LDF",
            0xBD => "FST",
            0xBF => "DOC",
            0xC0 => "PNT",
            0xC1 => "PIC",
            0xC2 => "ANI",
            0xC3 => "PAL",
            0xC8 => "FON",
            0xC9 => "FND",
            0xCA => "ICN",
            0xD5 => "MUS",
            0xD6 => "INS",
            0xD7 => "MDI",
            0xD8 => "SND",
            0xDB => "DBM",
            0xE0 => "LBR",
            0xEE => "R16",
            0xEF => "PAS",
            0xF0 => "CMD",
            0xF1 => "OVL",
            0xF2 => "UD2",
            0xF3 => "UD3",
            0xF4 => "UD4",
            0xF5 => "BAT",
            0xF6 => "UD6",
            0xF7 => "UD7",
            0xF8 => "PRG",
            0xF9 => "P16",
            0xFA => "INT",
            0xFB => "IVR",
            0xFC => "BAS",
            0xFD => "VAR",
            0xFE => "REL",
            0xFF => "SYS",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mnemonic() {
            Some(name) => f.write_str(name),
            None => write!(f, "${:02X}", self.0),
        }
    }
}

// ─────────────────────────────── access ──────────────────────────────────────

/// Access permission byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Access(pub u8);

impl Access {
    pub const DESTROY: u8 = 0x80;
    pub const RENAME: u8 = 0x40;
    pub const BACKUP: u8 = 0x20;
    pub const WRITE: u8 = 0x02;
    pub const READ: u8 = 0x01;

    pub fn contains(self, flag: u8) -> bool {
        self.0 & flag == flag
    }
}

// ─────────────────────────────── entry ───────────────────────────────────────

/// One decoded directory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub storage_type: StorageType,
    pub name: String,
    /// Name length nibble as stored.
    pub name_length: u8,
    pub file_type: FileType,
    pub key_block: u16,
    pub blocks_used: u16,
    pub eof: u32,
    pub created: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    pub version: u8,
    pub min_version: u8,
    pub access: Access,
    /// Only decoded for file storage types.
    pub aux_type: Option<u16>,
    /// Key block of the directory holding this entry.
    pub header_pointer: u16,
}

impl DirectoryEntry {
    pub fn is_deleted(&self) -> bool {
        self.storage_type == StorageType::Deleted
    }

    pub fn is_directory(&self) -> bool {
        self.storage_type == StorageType::Subdirectory
    }
}

/// An entry plus the field-level problems found while decoding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEntry {
    pub entry: DirectoryEntry,
    pub warnings: Vec<DecodeError>,
}

/// Check a name length nibble for an active record.
pub(crate) fn check_name_length(length: u8) -> Result<(), DecodeError> {
    if length == 0 || length > MAX_NAME_LENGTH {
        return Err(DecodeError::InvalidNameLength { length });
    }
    Ok(())
}

/// Subdirectory entries must be typed `$0F`, and only they may be.
fn check_file_type(storage_type: StorageType, file_type: FileType) -> Result<(), DecodeError> {
    let is_dir_type = file_type == FileType::DIRECTORY;
    let mismatch = match storage_type {
        StorageType::Subdirectory => !is_dir_type,
        s if s.is_file() => is_dir_type,
        _ => false,
    };
    if mismatch {
        return Err(DecodeError::FileTypeMismatch {
            storage_type,
            file_type: file_type.0,
        });
    }
    Ok(())
}

/// Decode a directory record, keeping it even when fields are bad.
///
/// `raw` is the header-declared entry span; only its first 39 bytes are read.
/// Fails only when the record is too short to hold an entry. Deleted entries
/// are returned without any warnings.
pub fn decode_entry_lossy(raw: &[u8]) -> Result<DecodedEntry, DecodeError> {
    if raw.len() < ENTRY_LENGTH {
        return Err(DecodeError::EntryTooShort { len: raw.len() });
    }

    let mut warnings = Vec::new();
    let storage_type = StorageType::from_nibble(raw[0] >> 4);
    let name_length = raw[0] & 0xF;

    if !storage_type.is_entry_type() {
        warnings.push(DecodeError::UnknownStorageType {
            storage_type: storage_type.nibble(),
        });
    }
    if let Err(e) = check_name_length(name_length) {
        warnings.push(e);
    }
    let file_type = FileType(raw[16]);
    if let Err(e) = check_file_type(storage_type, file_type) {
        warnings.push(e);
    }

    let version = raw[28];
    let min_version = raw[29];
    let name = decode_name(&raw[1..16], name_length as usize);
    let name = apply_case_flags(&name, read_u16(raw, 28));

    let created = read_timestamp(raw, 24).unwrap_or_else(|e| {
        warnings.push(e);
        None
    });
    let modified = read_timestamp(raw, 33).unwrap_or_else(|e| {
        warnings.push(e);
        None
    });

    let aux_type = storage_type.is_file().then(|| read_u16(raw, 31));

    let entry = DirectoryEntry {
        storage_type,
        name,
        name_length,
        file_type,
        key_block: read_u16(raw, 17),
        blocks_used: read_u16(raw, 19),
        eof: read_u24(raw, 21),
        created,
        modified,
        version,
        min_version,
        access: Access(raw[30]),
        aux_type,
        header_pointer: read_u16(raw, 37),
    };

    if entry.is_deleted() {
        warnings.clear();
    }
    Ok(DecodedEntry { entry, warnings })
}

/// Decode a directory record, rejecting it on the first field-level problem.
pub fn decode_entry(raw: &[u8]) -> Result<DirectoryEntry, DecodeError> {
    let decoded = decode_entry_lossy(raw)?;
    match decoded.warnings.into_iter().next() {
        Some(e) => Err(e),
        None => Ok(decoded.entry),
    }
}
