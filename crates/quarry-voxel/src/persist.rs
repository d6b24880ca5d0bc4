//! Whole-file NBT reads and crash-safe writes.
//!
//! Writes go to a temporary file next to the destination, are synced, and
//! are then renamed over it, so readers only ever see the old file or the
//! complete new one.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use quartz_nbt::NbtCompound;
use quartz_nbt::io::{Flavor, read_nbt, write_nbt};
use tempfile::NamedTempFile;

use crate::error::CodecError;

/// Reads a gzip-compressed NBT file and returns its root compound.
pub fn read_nbt_file(path: &Path) -> Result<NbtCompound, CodecError> {
    let mut reader = BufReader::new(File::open(path)?);
    let (root, _name) = read_nbt(&mut reader, Flavor::GzCompressed)?;
    Ok(root)
}

/// Atomically replaces `path` with `root` as gzip-compressed NBT, creating
/// parent directories as needed.
pub fn write_nbt_file(path: &Path, root: &NbtCompound) -> Result<(), CodecError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write_nbt(&mut writer, None, root, Flavor::GzCompressed)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
