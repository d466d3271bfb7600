//! Disk image access as a flat array of 512-byte blocks.
//!
//! The decoder in [`crate::fs`] only needs [`BlockStore`]; everything that
//! depends on how the image file is laid out (sector order, size checks)
//! stays in this module.

pub mod interleave;

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::error::SosDiskError;
pub use interleave::SectorOrder;

pub const BLOCK_SIZE: usize = 512;

/// One raw block as read from the image.
pub type Block = [u8; BLOCK_SIZE];

/// Errors raised by a [`BlockStore`] read.
#[derive(Error, Debug)]
pub enum BlockError {
    #[error("block {index} is outside the image ({block_count} blocks)")]
    OutOfRange { index: u32, block_count: u32 },

    #[error("failed to read block {index}: {source}")]
    Io {
        index: u32,
        #[source]
        source: std::io::Error,
    },
}

/// Random-access block source consumed by the directory decoder.
///
/// Block N lives at byte offset N x 512 of the underlying image; any header
/// skipping or sector reordering has already happened.
pub trait BlockStore {
    /// Number of whole blocks in the image.
    fn block_count(&self) -> u32;

    /// Read block `index`.
    fn read_block(&mut self, index: u32) -> Result<Block, BlockError>;
}

impl<S: BlockStore + ?Sized> BlockStore for &mut S {
    fn block_count(&self) -> u32 {
        (**self).block_count()
    }

    fn read_block(&mut self, index: u32) -> Result<Block, BlockError> {
        (**self).read_block(index)
    }
}

fn check_block_multiple(size: u64) -> Result<u32, SosDiskError> {
    if size % BLOCK_SIZE as u64 != 0 {
        return Err(SosDiskError::PartialBlock { size });
    }
    Ok((size / BLOCK_SIZE as u64).min(u32::MAX as u64) as u32)
}

// ─────────────────────────────── in-memory image ─────────────────────────────

/// A whole image held in memory, already in ProDOS block order.
#[derive(Debug, Clone)]
pub struct MemoryImage {
    data: Vec<u8>,
    block_count: u32,
}

impl MemoryImage {
    /// Wrap a ProDOS-ordered image. The length must be a whole number of blocks.
    pub fn new(data: Vec<u8>) -> Result<Self, SosDiskError> {
        let block_count = check_block_multiple(data.len() as u64)?;
        Ok(Self { data, block_count })
    }

    /// Wrap an image stored in `order`, converting it to ProDOS block order.
    pub fn with_order(data: Vec<u8>, order: SectorOrder) -> Result<Self, SosDiskError> {
        let data = interleave::to_prodos_order(data, order)?;
        Self::new(data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl BlockStore for MemoryImage {
    fn block_count(&self) -> u32 {
        self.block_count
    }

    fn read_block(&mut self, index: u32) -> Result<Block, BlockError> {
        if index >= self.block_count {
            return Err(BlockError::OutOfRange {
                index,
                block_count: self.block_count,
            });
        }
        let start = index as usize * BLOCK_SIZE;
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(&self.data[start..start + BLOCK_SIZE]);
        Ok(block)
    }
}

// ─────────────────────────────── stream image ────────────────────────────────

/// Block store over any seekable stream holding a ProDOS-ordered image.
pub struct ImageReader<R: Read + Seek> {
    reader: R,
    block_count: u32,
}

impl<R: Read + Seek> ImageReader<R> {
    pub fn new(mut reader: R) -> Result<Self, SosDiskError> {
        let size = reader.seek(SeekFrom::End(0))?;
        let block_count = check_block_multiple(size)?;
        Ok(Self {
            reader,
            block_count,
        })
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Seek> BlockStore for ImageReader<R> {
    fn block_count(&self) -> u32 {
        self.block_count
    }

    fn read_block(&mut self, index: u32) -> Result<Block, BlockError> {
        if index >= self.block_count {
            return Err(BlockError::OutOfRange {
                index,
                block_count: self.block_count,
            });
        }
        let mut block = [0u8; BLOCK_SIZE];
        self.reader
            .seek(SeekFrom::Start(index as u64 * BLOCK_SIZE as u64))
            .and_then(|_| self.reader.read_exact(&mut block))
            .map_err(|source| BlockError::Io { index, source })?;
        Ok(block)
    }
}

/// Load an image file into memory.
///
/// `order` overrides the sector order; when `None` it is inferred from the
/// file extension.
pub fn open_image(path: &Path, order: Option<SectorOrder>) -> Result<MemoryImage, SosDiskError> {
    let order = match order {
        Some(order) => order,
        None => SectorOrder::from_path(path)
            .ok_or_else(|| SosDiskError::UnknownSectorOrder(path.display().to_string()))?,
    };
    let data = fs::read(path)?;
    debug!(
        "loaded {} ({} bytes, {:?} order)",
        path.display(),
        data.len(),
        order
    );
    MemoryImage::with_order(data, order)
}
