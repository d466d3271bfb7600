//! Sector-order conversion for 16-sector 5.25" floppy images.
//!
//! A 140 KiB image file stores 35 tracks of 16 256-byte sectors. DOS 3.3
//! images (`.do`, `.dsk`) list each track's sectors in DOS logical order;
//! ProDOS images (`.po`) list them so that consecutive pairs form blocks.

use std::path::Path;

use crate::error::SosDiskError;

const TRACKS: usize = 35;
const SECTORS_PER_TRACK: usize = 16;
const SECTOR_SIZE: usize = 256;
pub const FLOPPY_IMAGE_SIZE: usize = TRACKS * SECTORS_PER_TRACK * SECTOR_SIZE;

/// Physical sector holding each DOS 3.3 logical sector.
const DOS_TO_PHYSICAL: [usize; SECTORS_PER_TRACK] = [
    0x0, 0xd, 0xb, 0x9, 0x7, 0x5, 0x3, 0x1, 0xe, 0xc, 0xa, 0x8, 0x6, 0x4, 0x2, 0xf,
];

/// Physical sector holding each ProDOS half-block.
const PRODOS_TO_PHYSICAL: [usize; SECTORS_PER_TRACK] = [
    0x0, 0x2, 0x4, 0x6, 0x8, 0xa, 0xc, 0xe, 0x1, 0x3, 0x5, 0x7, 0x9, 0xb, 0xd, 0xf,
];

/// Order of the 256-byte sectors within an image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorOrder {
    Dos,
    ProDos,
}

impl SectorOrder {
    /// Infer the order from a file extension (`.do`/`.dsk` or `.po`).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "do" | "dsk" => Some(SectorOrder::Dos),
            "po" => Some(SectorOrder::ProDos),
            _ => None,
        }
    }

    fn physical_map(self) -> &'static [usize; SECTORS_PER_TRACK] {
        match self {
            SectorOrder::Dos => &DOS_TO_PHYSICAL,
            SectorOrder::ProDos => &PRODOS_TO_PHYSICAL,
        }
    }
}

/// Reorder sectors of a floppy image from `from` order into `to` order.
pub fn reorder(data: &[u8], from: SectorOrder, to: SectorOrder) -> Result<Vec<u8>, SosDiskError> {
    if data.len() != FLOPPY_IMAGE_SIZE {
        return Err(SosDiskError::NotAFloppyImage {
            size: data.len() as u64,
        });
    }

    let mut physical_to_dest = [0usize; SECTORS_PER_TRACK];
    for (logical, &physical) in to.physical_map().iter().enumerate() {
        physical_to_dest[physical] = logical;
    }

    let mut out = vec![0u8; data.len()];
    for track in 0..TRACKS {
        for (src_sector, &physical) in from.physical_map().iter().enumerate() {
            let dest_sector = physical_to_dest[physical];
            let src = (track * SECTORS_PER_TRACK + src_sector) * SECTOR_SIZE;
            let dest = (track * SECTORS_PER_TRACK + dest_sector) * SECTOR_SIZE;
            out[dest..dest + SECTOR_SIZE].copy_from_slice(&data[src..src + SECTOR_SIZE]);
        }
    }
    Ok(out)
}

/// Convert an image in `order` into ProDOS block order.
///
/// ProDOS-ordered data is returned untouched, whatever its size.
pub fn to_prodos_order(data: Vec<u8>, order: SectorOrder) -> Result<Vec<u8>, SosDiskError> {
    match order {
        SectorOrder::ProDos => Ok(data),
        SectorOrder::Dos => reorder(&data, SectorOrder::Dos, SectorOrder::ProDos),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dos_image_with_sector_ids() -> Vec<u8> {
        let mut data = vec![0u8; FLOPPY_IMAGE_SIZE];
        for (i, sector) in data.chunks_mut(SECTOR_SIZE).enumerate() {
            // track in the first byte, DOS logical sector in the second
            sector[0] = (i / SECTORS_PER_TRACK) as u8;
            sector[1] = (i % SECTORS_PER_TRACK) as u8;
        }
        data
    }

    #[test]
    fn test_order_from_extension() {
        assert_eq!(SectorOrder::from_path(Path::new("a.DSK")), Some(SectorOrder::Dos));
        assert_eq!(SectorOrder::from_path(Path::new("a.do")), Some(SectorOrder::Dos));
        assert_eq!(SectorOrder::from_path(Path::new("a.po")), Some(SectorOrder::ProDos));
        assert_eq!(SectorOrder::from_path(Path::new("a.2mg")), None);
        assert_eq!(SectorOrder::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_dos_to_prodos_block_layout() {
        let converted = to_prodos_order(dos_image_with_sector_ids(), SectorOrder::Dos).unwrap();

        // Block 0 = physical sectors 0 and 2 = DOS sectors 0x0 and 0xE.
        assert_eq!(&converted[0..2], &[0, 0x0]);
        assert_eq!(&converted[256..258], &[0, 0xE]);

        // Block 2 (volume directory) = physical 8 and 10 = DOS 0xB and 0xA.
        assert_eq!(&converted[1024..1026], &[0, 0xB]);
        assert_eq!(&converted[1280..1282], &[0, 0xA]);

        // Track 1 starts at block 8.
        assert_eq!(&converted[8 * 512..8 * 512 + 2], &[1, 0x0]);
    }

    #[test]
    fn test_reorder_is_reversible() {
        let dos = dos_image_with_sector_ids();
        let prodos = reorder(&dos, SectorOrder::Dos, SectorOrder::ProDos).unwrap();
        assert_ne!(prodos, dos);
        let back = reorder(&prodos, SectorOrder::ProDos, SectorOrder::Dos).unwrap();
        assert_eq!(back, dos);
    }

    #[test]
    fn test_dos_order_requires_floppy_size() {
        let err = to_prodos_order(vec![0u8; 800 * 1024], SectorOrder::Dos).unwrap_err();
        assert!(matches!(err, SosDiskError::NotAFloppyImage { .. }));

        let big = to_prodos_order(vec![0u8; 800 * 1024], SectorOrder::ProDos).unwrap();
        assert_eq!(big.len(), 800 * 1024);
    }
}
