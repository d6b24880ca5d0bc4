//! On-disk layout of a world directory.
//!
//! Chunk files are bucketed into 64 × 64 directories by the low six bits of
//! each coordinate, keeping the file count per directory bounded:
//!
//! ```text
//! <world>/<base36(cx & 63)>/<base36(cz & 63)>/c.<base36(cx)>.<base36(cz)>.dat
//! <world>/level.dat
//! ```

use std::path::{Path, PathBuf};

use crate::coords::ChunkPos;

/// File name of the world metadata file.
pub const LEVEL_FILE: &str = "level.dat";

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Lower-case base-36 rendering of `value`, with a leading `-` when negative.
pub fn base36(value: i32) -> String {
    let mut n = value.unsigned_abs();
    if n == 0 {
        return "0".to_owned();
    }
    let mut digits = Vec::with_capacity(8);
    while n > 0 {
        digits.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    if value < 0 {
        digits.push(b'-');
    }
    digits.iter().rev().map(|d| char::from(*d)).collect()
}

/// Path of the chunk file for `pos` inside `world_dir`.
pub fn chunk_path(world_dir: &Path, pos: ChunkPos) -> PathBuf {
    world_dir
        .join(base36(pos.x & 0x3F))
        .join(base36(pos.z & 0x3F))
        .join(format!("c.{}.{}.dat", base36(pos.x), base36(pos.z)))
}

/// Path of the world metadata file inside `world_dir`.
pub fn level_path(world_dir: &Path) -> PathBuf {
    world_dir.join(LEVEL_FILE)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
