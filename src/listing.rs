//! Text and JSON rendering of a decoded volume tree.

use std::io::{self, Write};

use log::debug;

use crate::fs::{entry_allocation, DecodeError, DirectoryNode, EntryNode, VolumeTree};
use crate::image::BlockStore;

/// Attribute characters indexed by bit; bit 8 is the synthesized sparse flag.
const ATTR_CHARS: &[u8; 9] = b"rw234bnds";
const SPARSE_BIT: u16 = 1 << 8;

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Descend into subdirectories, prefixing names with their parent path.
    pub recursive: bool,
    /// Show creation time, type, attributes and size before each name.
    pub long: bool,
}

/// Write the `ls` listing of `tree` to `out`, followed by its diagnostics.
///
/// `store` must be the image the tree was decoded from; the long form reads
/// file index blocks to flag sparse files.
pub fn render<S: BlockStore, W: Write>(
    tree: &VolumeTree,
    store: &mut S,
    options: &RenderOptions,
    out: &mut W,
) -> io::Result<()> {
    writeln!(out, "volume /{}:", tree.volume_name())?;
    render_directory(&tree.root, "", store, options, out)?;

    if !tree.is_clean() {
        writeln!(out)?;
        writeln!(out, "diagnostics:")?;
        for diagnostic in &tree.diagnostics {
            writeln!(out, "  {diagnostic}")?;
        }
    }
    Ok(())
}

/// Serialize `tree` as pretty-printed JSON.
pub fn render_json<W: Write>(tree: &VolumeTree, out: &mut W) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, tree)?;
    writeln!(out)
}

fn render_directory<S: BlockStore, W: Write>(
    node: &DirectoryNode,
    prefix: &str,
    store: &mut S,
    options: &RenderOptions,
    out: &mut W,
) -> io::Result<()> {
    for entry in &node.entries {
        let mut allocation_error = None;
        if options.long {
            let (columns, error) = long_columns(entry, store);
            write!(out, "{columns}")?;
            allocation_error = error;
        }
        write!(out, "  {prefix}{}", entry.name())?;
        let damage = entry
            .subtree_error()
            .or(entry.warnings.first())
            .or(allocation_error.as_ref());
        if let Some(e) = damage {
            write!(out, "  (damaged: {e})")?;
        }
        writeln!(out)?;

        if options.recursive {
            if let Some(child) = entry.directory() {
                let child_prefix = format!("{prefix}{}/", entry.name());
                render_directory(child, &child_prefix, store, options, out)?;
            }
        }
    }
    Ok(())
}

/// Long-form columns, plus the error from reading the file's index blocks.
fn long_columns<S: BlockStore>(
    node: &EntryNode,
    store: &mut S,
) -> (String, Option<DecodeError>) {
    let entry = &node.entry;
    let created = match entry.created {
        Some(t) => t.format("%Y-%m-%d %H:%M").to_string(),
        None => "<no date>".to_string(),
    };

    let mut bits = entry.access.0 as u16;
    let mut error = None;
    if entry.storage_type.is_file() {
        match entry_allocation(store, entry) {
            Ok(alloc) if alloc.is_sparse() => bits |= SPARSE_BIT,
            Ok(_) => {}
            Err(e) => {
                debug!("{}: allocation unavailable: {e}", entry.name);
                error = Some(e);
            }
        }
    }

    let columns = format!(
        "  {created:<16}  {}  {}  {:6}",
        entry.file_type,
        attributes(bits),
        entry.eof
    );
    (columns, error)
}

fn attributes(bits: u16) -> String {
    (0..ATTR_CHARS.len())
        .rev()
        .map(|b| {
            if bits & (1 << b) != 0 {
                ATTR_CHARS[b] as char
            } else {
                '.'
            }
        })
        .collect()
}
