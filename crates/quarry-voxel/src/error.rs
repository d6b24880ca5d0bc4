//! Errors raised while decoding or persisting chunk and world files.

use quartz_nbt::io::NbtIoError;

use crate::coords::ChunkPos;

/// A chunk or world file could not be read, decoded, or written.
///
/// Every decoding variant means the file is corrupt: the loader treats the
/// chunk as unavailable and never overwrites the file on its own.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The NBT stream itself is malformed or not gzip-compressed.
    #[error("NBT error: {0}")]
    Nbt(#[from] NbtIoError),
    /// A required field is absent or has the wrong tag type.
    #[error("missing or mistyped field `{0}`")]
    MissingField(&'static str),
    /// A fixed-size byte array has the wrong length.
    #[error("field `{field}` holds {actual} bytes, expected {expected}")]
    WrongLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The embedded `xPos`/`zPos` does not match the requested chunk.
    #[error(
        "chunk file holds ({}, {}) but ({}, {}) was requested",
        found.x, found.z, expected.x, expected.z
    )]
    PositionMismatch { expected: ChunkPos, found: ChunkPos },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
