//! Block allocation of seedling, sapling and tree files.
//!
//! Index block layout: low bytes of 256 block pointers at offsets 0–255,
//! high bytes at 256–511. Pointer 0 is a sparse hole.

use serde::Serialize;

use super::entry::{DirectoryEntry, StorageType};
use super::error::DecodeError;
use crate::image::BlockStore;

/// Tree master index blocks only use their first 128 slots (16 MiB files).
const TREE_INDEX_SLOTS: usize = 128;
const INDEX_POINTERS: usize = 256;

/// How many blocks a file occupies and whether it has holes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Allocation {
    pub index_blocks: u32,
    pub data_blocks: u32,
    /// Highest logical block number that is allocated.
    pub last_data_block: Option<u32>,
}

impl Allocation {
    /// True when some logical block before the last one is a hole.
    pub fn is_sparse(&self) -> bool {
        match self.last_data_block {
            Some(last) => self.data_blocks != last + 1,
            None => false,
        }
    }

    pub fn total_blocks(&self) -> u32 {
        self.index_blocks + self.data_blocks
    }

    fn add_data_block(&mut self, logical: u32) {
        self.data_blocks += 1;
        self.last_data_block = Some(logical);
    }
}

fn check_pointer(block_count: u32, block: u16) -> Result<(), DecodeError> {
    if block as u32 >= block_count {
        return Err(DecodeError::BlockOutOfRange {
            block: block as u32,
            block_count,
        });
    }
    Ok(())
}

fn read_index_block(
    store: &mut impl BlockStore,
    block: u16,
) -> Result<[u16; INDEX_POINTERS], DecodeError> {
    let buf = store.read_block(block as u32)?;
    let mut ptrs = [0u16; INDEX_POINTERS];
    for (i, ptr) in ptrs.iter_mut().enumerate() {
        *ptr = buf[i] as u16 | ((buf[INDEX_POINTERS + i] as u16) << 8);
    }
    Ok(ptrs)
}

/// Count the index and data blocks of a file with the given storage type.
///
/// Storage types without block pointers (directories, Pascal areas, extended
/// files, unknown tags) report an empty allocation.
pub fn allocation(
    store: &mut impl BlockStore,
    storage_type: StorageType,
    key_block: u16,
) -> Result<Allocation, DecodeError> {
    let mut alloc = Allocation::default();
    match storage_type {
        StorageType::Seedling => {
            if key_block != 0 {
                check_pointer(store.block_count(), key_block)?;
                alloc.add_data_block(0);
            }
        }
        StorageType::Sapling => {
            let index = read_index_block(store, key_block)?;
            alloc.index_blocks = 1;
            for (i, &ptr) in index.iter().enumerate() {
                if ptr != 0 {
                    check_pointer(store.block_count(), ptr)?;
                    alloc.add_data_block(i as u32);
                }
            }
        }
        StorageType::Tree => {
            let master = read_index_block(store, key_block)?;
            alloc.index_blocks = 1;
            for (i, &index_ptr) in master[..TREE_INDEX_SLOTS].iter().enumerate() {
                if index_ptr == 0 {
                    continue;
                }
                let index = read_index_block(store, index_ptr)?;
                alloc.index_blocks += 1;
                for (j, &ptr) in index.iter().enumerate() {
                    if ptr != 0 {
                        check_pointer(store.block_count(), ptr)?;
                        alloc.add_data_block((i * INDEX_POINTERS + j) as u32);
                    }
                }
            }
        }
        _ => {}
    }
    Ok(alloc)
}

/// [`allocation`] for a decoded entry.
pub fn entry_allocation(
    store: &mut impl BlockStore,
    entry: &DirectoryEntry,
) -> Result<Allocation, DecodeError> {
    allocation(store, entry.storage_type, entry.key_block)
}
