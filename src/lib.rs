//! Read-only decoder for Apple III SOS and Apple II ProDOS disk images.
//!
//! [`image`] turns an image file into numbered 512-byte blocks, [`fs`] decodes
//! the volume directory tree from those blocks, and [`listing`] renders it.

pub mod error;
pub mod fs;
pub mod image;
pub mod listing;

pub use error::SosDiskError;
pub use fs::{build_tree, DecodeError, Diagnostic, VolumeTree};
pub use image::{open_image, BlockStore, MemoryImage, SectorOrder};
