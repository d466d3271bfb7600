//! SOS/ProDOS directory decoding.
//!
//! Flow: [`entry`] and [`header`] decode fixed-width records, [`walker`]
//! follows directory block chains and recurses into subdirectories, and
//! [`tree`] starts the walk at the volume directory.

pub mod entry;
pub mod error;
pub mod fields;
pub mod header;
pub mod storage;
pub mod tree;
pub mod walker;

pub use entry::{
    decode_entry, decode_entry_lossy, Access, DecodedEntry, DirectoryEntry, FileType, StorageType,
};
pub use error::{DecodeError, Diagnostic};
pub use header::{decode_header, DirectoryHeader, HeaderKind, HeaderLinks};
pub use storage::{allocation, entry_allocation, Allocation};
pub use tree::{build_tree, VolumeTree, VOLUME_KEY_BLOCK};
pub use walker::{walk_directory, DirectoryNode, EntryNode, Subdirectory, MAX_DIRECTORY_DEPTH};
