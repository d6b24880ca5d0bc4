//! World, chunk, and chunk-local coordinate types.
//!
//! A chunk is a 16×128×16 column of voxels. World coordinates map to chunk
//! coordinates with floor division (`div_euclid`) so negative coordinates
//! land in the correct chunk, and to local offsets with the matching
//! non-negative remainder (`rem_euclid`).

/// Width of a chunk along X and Z, in voxels.
pub const CHUNK_WIDTH: usize = 16;

/// Height of a chunk along Y, in voxels.
pub const CHUNK_HEIGHT: usize = 128;

/// Total number of voxels in a chunk (16 × 128 × 16).
pub const CHUNK_VOLUME: usize = CHUNK_WIDTH * CHUNK_HEIGHT * CHUNK_WIDTH;

/// Highest valid Y coordinate.
pub const MAX_Y: i32 = CHUNK_HEIGHT as i32 - 1;

/// Identifies a chunk column in the world grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    /// Chunk-grid X coordinate.
    pub x: i32,
    /// Chunk-grid Z coordinate.
    pub z: i32,
}

impl ChunkPos {
    /// Creates a new chunk position.
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Returns the chunk containing the world column `(x, z)`.
    pub fn from_block(x: i32, z: i32) -> Self {
        Self {
            x: x.div_euclid(CHUNK_WIDTH as i32),
            z: z.div_euclid(CHUNK_WIDTH as i32),
        }
    }

    /// Returns the chunk offset by `(dx, dz)` chunks.
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// World X/Z of the chunk's `(0, 0)` column.
    pub fn origin(self) -> (i32, i32) {
        (self.x * CHUNK_WIDTH as i32, self.z * CHUNK_WIDTH as i32)
    }

    /// [`origin`](Self::origin), or `None` for a chunk beyond the block grid.
    pub fn checked_origin(self) -> Option<(i32, i32)> {
        let width = CHUNK_WIDTH as i32;
        Some((self.x.checked_mul(width)?, self.z.checked_mul(width)?))
    }

    /// World position of a local offset inside this chunk.
    pub fn block_at(self, local: LocalPos) -> BlockPos {
        let (ox, oz) = self.origin();
        BlockPos::new(
            ox + i32::from(local.x),
            i32::from(local.y),
            oz + i32::from(local.z),
        )
    }
}

/// An absolute voxel position in world coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    /// Creates a new block position.
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the position offset by `(dx, dy, dz)`.
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// Like [`offset`](Self::offset), but `None` if any component overflows.
    pub fn checked_offset(self, dx: i32, dy: i32, dz: i32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
            z: self.z.checked_add(dz)?,
        })
    }

    /// Returns `true` if `y` lies inside `[0, 127]`.
    pub fn in_height_range(self) -> bool {
        (0..=MAX_Y).contains(&self.y)
    }

    /// The chunk that owns this position.
    pub fn chunk(self) -> ChunkPos {
        ChunkPos::from_block(self.x, self.z)
    }

    /// Chunk-local offset of this position, or `None` if `y` is out of range.
    pub fn local(self) -> Option<LocalPos> {
        if !self.in_height_range() {
            return None;
        }
        Some(LocalPos {
            x: self.x.rem_euclid(CHUNK_WIDTH as i32) as u8,
            y: self.y as u8,
            z: self.z.rem_euclid(CHUNK_WIDTH as i32) as u8,
        })
    }
}

/// A validated position inside a single chunk.
///
/// `x` and `z` are in `[0, 16)`, `y` is in `[0, 128)`. Constructing one
/// through [`LocalPos::new`] or [`BlockPos::local`] is the only range
/// check; [`LocalPos::index`] relies on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalPos {
    x: u8,
    y: u8,
    z: u8,
}

impl LocalPos {
    /// Creates a local position, or `None` if any component is out of range.
    pub fn new(x: u8, y: u8, z: u8) -> Option<Self> {
        if usize::from(x) < CHUNK_WIDTH
            && usize::from(y) < CHUNK_HEIGHT
            && usize::from(z) < CHUNK_WIDTH
        {
            Some(Self { x, y, z })
        } else {
            None
        }
    }

    pub fn x(self) -> u8 {
        self.x
    }

    pub fn y(self) -> u8 {
        self.y
    }

    pub fn z(self) -> u8 {
        self.z
    }

    /// Linear index into a chunk's block array.
    ///
    /// Y varies fastest, then Z, then X: `y + (z << 7) + (x << 11)`.
    /// Always `< CHUNK_VOLUME`; its parity equals the parity of `y`.
    pub fn index(self) -> usize {
        usize::from(self.y) + (usize::from(self.z) << 7) + (usize::from(self.x) << 11)
    }

    /// Index of this column in a chunk's 256-entry height map.
    pub fn column_index(self) -> usize {
        column_index(self.x, self.z)
    }
}

/// Index of column `(x, z)` in a chunk's height map: `z + (x << 4)`.
pub fn column_index(x: u8, z: u8) -> usize {
    usize::from(z) + (usize::from(x) << 4)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
