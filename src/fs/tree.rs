use log::debug;
use serde::Serialize;

use super::error::{DecodeError, Diagnostic};
use super::header::HeaderKind;
use super::walker::{DirectoryNode, Walker};
use crate::image::BlockStore;

/// Key block of the volume directory; blocks 0 and 1 hold the boot loader.
pub const VOLUME_KEY_BLOCK: u32 = 2;

/// A fully decoded volume: the directory tree plus every problem found while
/// building it, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeTree {
    pub root: DirectoryNode,
    pub diagnostics: Vec<Diagnostic>,
}

impl VolumeTree {
    pub fn volume_name(&self) -> &str {
        self.root.name()
    }

    /// True when decoding found nothing to report.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Decode the whole directory tree of the volume in `store`.
///
/// Only an unreadable or invalid volume directory header is an error; every
/// other problem is attached to the tree and listed in
/// [`VolumeTree::diagnostics`].
pub fn build_tree<S: BlockStore + ?Sized>(store: &mut S) -> Result<VolumeTree, DecodeError> {
    let actual_blocks = store.block_count();

    let mut walker = Walker::new(store);
    let root = walker.walk(VOLUME_KEY_BLOCK, HeaderKind::Volume, "", 0)?;
    let mut diagnostics = walker.into_diagnostics();

    if let Some(declared) = root.header.total_blocks() {
        if declared as u32 != actual_blocks {
            diagnostics.insert(
                0,
                Diagnostic {
                    path: format!("/{}", root.name()),
                    block: Some(VOLUME_KEY_BLOCK),
                    slot: Some(0),
                    error: DecodeError::VolumeSizeMismatch {
                        declared,
                        actual: actual_blocks,
                    },
                },
            );
        }
    }

    debug!(
        "volume /{}: {} subdirectories, {} diagnostics",
        root.name(),
        root.directory_count(),
        diagnostics.len()
    );
    Ok(VolumeTree { root, diagnostics })
}
