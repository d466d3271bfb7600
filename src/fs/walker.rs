//! Directory block-chain traversal.
//!
//! A directory is a linked list of blocks: bytes 0–1 point to the previous
//! block, bytes 2–3 to the next (0 ends the chain). Slot 0 of the first block
//! is the header, every other slot is an entry of the header-declared length.

use std::collections::HashSet;

use log::{debug, info};
use serde::Serialize;

use super::entry::{decode_entry_lossy, DirectoryEntry, StorageType};
use super::error::{DecodeError, Diagnostic};
use super::fields::read_u16;
use super::header::{decode_header, DirectoryHeader, HeaderKind, DIRECTORY_LINK_SIZE};
use crate::image::{Block, BlockStore};

/// Subdirectory nesting the walker follows before giving up.
pub const MAX_DIRECTORY_DEPTH: usize = 64;

// ─────────────────────────────── tree types ──────────────────────────────────

/// A decoded directory: header plus entries in on-disk order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryNode {
    pub key_block: u32,
    pub header: DirectoryHeader,
    /// Directory blocks in chain order, key block first.
    pub blocks: Vec<u32>,
    pub entries: Vec<EntryNode>,
    /// Header field problems and a file count mismatch, if any.
    pub warnings: Vec<DecodeError>,
    /// Set when the block chain could not be followed to its end; `entries`
    /// then holds what was decoded before the failure.
    pub error: Option<DecodeError>,
}

/// A non-deleted entry and, for subdirectories, what it points to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryNode {
    pub entry: DirectoryEntry,
    pub block: u32,
    pub slot: usize,
    pub warnings: Vec<DecodeError>,
    pub subdirectory: Option<Subdirectory>,
}

/// Result of walking a subdirectory entry's key block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Subdirectory {
    Node(DirectoryNode),
    Damaged(DecodeError),
}

impl DirectoryNode {
    pub fn name(&self) -> &str {
        &self.header.name
    }

    /// Nested directory nodes below this one (not counting itself).
    pub fn directory_count(&self) -> usize {
        self.subdirectories()
            .map(|node| 1 + node.directory_count())
            .sum()
    }

    /// Directly nested subdirectory nodes that decoded.
    pub fn subdirectories(&self) -> impl Iterator<Item = &DirectoryNode> {
        self.entries.iter().filter_map(EntryNode::directory)
    }

    pub fn find(&self, name: &str) -> Option<&EntryNode> {
        self.entries.iter().find(|e| e.entry.name == name)
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

impl EntryNode {
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn directory(&self) -> Option<&DirectoryNode> {
        match &self.subdirectory {
            Some(Subdirectory::Node(node)) => Some(node),
            _ => None,
        }
    }

    /// The error that stopped this entry's subtree, if any.
    pub fn subtree_error(&self) -> Option<&DecodeError> {
        match &self.subdirectory {
            Some(Subdirectory::Damaged(e)) => Some(e),
            Some(Subdirectory::Node(node)) => node.error.as_ref(),
            None => None,
        }
    }

    pub fn is_damaged(&self) -> bool {
        !self.warnings.is_empty() || self.subtree_error().is_some()
    }
}

// ─────────────────────────────── walker ──────────────────────────────────────

/// Walk state shared across one traversal: every directory block seen so far
/// and the diagnostics collected in discovery order.
pub(crate) struct Walker<'a, S: BlockStore + ?Sized> {
    store: &'a mut S,
    visited: HashSet<u32>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a, S: BlockStore + ?Sized> Walker<'a, S> {
    pub(crate) fn new(store: &'a mut S) -> Self {
        Self {
            store,
            visited: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn record(&mut self, path: &str, block: Option<u32>, slot: Option<usize>, error: DecodeError) {
        info!("{path}: {error}");
        self.diagnostics.push(Diagnostic {
            path: path.to_string(),
            block,
            slot,
            error,
        });
    }

    /// Claim a directory block, failing if an earlier chain already used it.
    fn visit(&mut self, block: u32) -> Result<Block, DecodeError> {
        if !self.visited.insert(block) {
            return Err(DecodeError::DirectoryCycle { block });
        }
        Ok(self.store.read_block(block)?)
    }

    /// Walk the directory whose key block is `first_block`.
    ///
    /// `path` is the directory's path as seen from its parent (empty for the
    /// volume directory, whose path comes from its own header).
    pub(crate) fn walk(
        &mut self,
        first_block: u32,
        expected: HeaderKind,
        path: &str,
        depth: usize,
    ) -> Result<DirectoryNode, DecodeError> {
        if depth > MAX_DIRECTORY_DEPTH {
            return Err(DecodeError::DepthLimitExceeded {
                limit: MAX_DIRECTORY_DEPTH,
            });
        }

        let key = self.visit(first_block)?;
        let decoded = decode_header(&key[DIRECTORY_LINK_SIZE..], expected)?;
        let header = decoded.header;

        let path = match expected {
            HeaderKind::Volume => format!("/{}", header.name),
            HeaderKind::Subdirectory => path.to_string(),
        };
        debug!(
            "{path}: key block {first_block}, {} x {}-byte entries per block",
            header.entries_per_block, header.entry_length
        );
        for warning in &decoded.warnings {
            self.record(&path, Some(first_block), Some(0), warning.clone());
        }

        let mut node = DirectoryNode {
            key_block: first_block,
            header,
            blocks: vec![first_block],
            entries: Vec::new(),
            warnings: decoded.warnings,
            error: None,
        };

        let mut current = key;
        let mut block_num = first_block;
        let mut first_slot = 1;
        loop {
            self.decode_slots(&mut node, &current, block_num, first_slot, &path, depth);

            let next = read_u16(&current, 2) as u32;
            if next == 0 {
                break;
            }
            debug!("{path}: following chain {block_num} -> {next}");
            match self.visit(next) {
                Ok(block) => {
                    current = block;
                    block_num = next;
                    first_slot = 0;
                    node.blocks.push(next);
                }
                Err(e) => {
                    self.record(&path, Some(next), None, e.clone());
                    node.error = Some(e);
                    break;
                }
            }
        }

        if node.is_complete() && node.entries.len() != node.header.file_count as usize {
            let mismatch = DecodeError::FileCountMismatch {
                declared: node.header.file_count,
                found: node.entries.len(),
            };
            self.record(&path, Some(first_block), Some(0), mismatch.clone());
            node.warnings.push(mismatch);
        }

        Ok(node)
    }

    /// File key blocks are not read during the walk, only range-checked.
    /// Key block 0 marks a file with no data block.
    fn check_key_block(&self, entry: &DirectoryEntry) -> Result<(), DecodeError> {
        let block_count = self.store.block_count();
        let key_block = entry.key_block as u32;
        if entry.storage_type.is_file() && key_block != 0 && key_block >= block_count {
            return Err(DecodeError::BlockOutOfRange {
                block: key_block,
                block_count,
            });
        }
        Ok(())
    }

    fn decode_slots(
        &mut self,
        node: &mut DirectoryNode,
        block: &Block,
        block_num: u32,
        first_slot: usize,
        path: &str,
        depth: usize,
    ) {
        let entry_length = node.header.entry_length as usize;
        for slot in first_slot..node.header.entries_per_block as usize {
            let offset = node.header.slot_offset(slot);
            let raw = &block[offset..offset + entry_length];

            let mut decoded = match decode_entry_lossy(raw) {
                Ok(decoded) => decoded,
                Err(e) => {
                    self.record(path, Some(block_num), Some(slot), e);
                    continue;
                }
            };
            if decoded.entry.is_deleted() {
                continue;
            }

            if let Err(e) = self.check_key_block(&decoded.entry) {
                decoded.warnings.push(e);
            }

            let child_path = format!("{path}/{}", decoded.entry.name);
            for warning in &decoded.warnings {
                self.record(&child_path, Some(block_num), Some(slot), warning.clone());
            }

            let subdirectory = if decoded.entry.storage_type == StorageType::Subdirectory {
                let key_block = decoded.entry.key_block as u32;
                match self.walk(key_block, HeaderKind::Subdirectory, &child_path, depth + 1) {
                    Ok(child) => Some(Subdirectory::Node(child)),
                    Err(e) => {
                        self.record(&child_path, Some(key_block), None, e.clone());
                        Some(Subdirectory::Damaged(e))
                    }
                }
            } else {
                None
            };

            node.entries.push(EntryNode {
                entry: decoded.entry,
                block: block_num,
                slot,
                warnings: decoded.warnings,
                subdirectory,
            });
        }
    }
}

/// Decode the directory at `first_block` and everything below it.
///
/// Problems below the top-level header are attached to the returned tree
/// rather than returned as errors; see [`crate::fs::build_tree`] for the
/// variant that also returns them as an ordered list.
pub fn walk_directory<S: BlockStore + ?Sized>(
    store: &mut S,
    first_block: u32,
    expected: HeaderKind,
) -> Result<DirectoryNode, DecodeError> {
    Walker::new(store).walk(first_block, expected, "", 0)
}
