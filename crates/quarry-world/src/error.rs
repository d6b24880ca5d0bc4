//! Errors returned by world operations.

use std::path::PathBuf;

use quarry_voxel::CodecError;

#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// `y` is outside `0..=127`. Nothing was changed.
    #[error("y = {y} is outside the world height")]
    OutOfRange { y: i32 },
    /// The chunk is not resident, has no readable file, and generation was
    /// not permitted (or its file is corrupt).
    #[error("chunk ({cx}, {cz}) is unavailable")]
    ChunkUnavailable { cx: i32, cz: i32 },
    /// The column is too far out for a fixed-point entity position.
    #[error("column ({x}, {z}) is beyond the entity position range")]
    BeyondItemRange { x: i32, z: i32 },
    /// A locked chest or furnace can only be replaced by its owner.
    #[error("tile entity at ({x}, {y}, {z}) is locked")]
    Locked { x: i32, y: i32, z: i32 },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The world directory or its metadata file could not be created.
    #[error("cannot initialise world at {}: {source}", path.display())]
    StartupIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
