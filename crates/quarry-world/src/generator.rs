//! The terrain generator seam and a flat reference generator.

use quarry_voxel::block::{AIR, BEDROCK, DIRT, GRASS, LEAVES, LOG, STONE};
use quarry_voxel::{BlockId, BlockPos, CHUNK_WIDTH, Chunk, LocalPos};

/// One voxel a generator wants written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockPlacement {
    pub pos: BlockPos,
    pub id: BlockId,
    pub metadata: u8,
}

/// Produces raw voxel content for new chunks and trees for grown saplings.
///
/// Generators only write voxels. Lighting, the height map, and persistence
/// are handled by the store afterwards.
pub trait TerrainGenerator: Send + Sync {
    /// Seeds the generator. Called once, before any other method.
    fn init(&mut self, seed: i64);

    /// Fills a freshly created, all-air chunk.
    fn generate(&self, chunk: &mut Chunk);

    /// Voxels of a tree whose trunk starts at `base`.
    fn grow_tree(&self, base: BlockPos) -> Vec<BlockPlacement>;
}

/// Bedrock floor, stone, three layers of dirt, then grass at `y = 63`.
#[derive(Clone, Debug, Default)]
pub struct FlatGenerator {
    seed: i64,
}

impl FlatGenerator {
    /// Y of the grass layer.
    pub const SURFACE_Y: u8 = 63;

    pub fn seed(&self) -> i64 {
        self.seed
    }

    fn layer(y: u8) -> BlockId {
        match y {
            0 => BEDROCK,
            1..=59 => STONE,
            60..=62 => DIRT,
            Self::SURFACE_Y => GRASS,
            _ => AIR,
        }
    }
}

impl TerrainGenerator for FlatGenerator {
    fn init(&mut self, seed: i64) {
        self.seed = seed;
    }

    fn generate(&self, chunk: &mut Chunk) {
        for x in 0..CHUNK_WIDTH as u8 {
            for z in 0..CHUNK_WIDTH as u8 {
                for y in 0..=Self::SURFACE_Y {
                    if let Some(local) = LocalPos::new(x, y, z) {
                        chunk.set_block(local, Self::layer(y), 0);
                    }
                }
            }
        }
    }

    fn grow_tree(&self, base: BlockPos) -> Vec<BlockPlacement> {
        // Trunk height varies between 4 and 6 with the seed and position.
        let mix = self.seed ^ i64::from(base.x).wrapping_mul(31) ^ i64::from(base.z);
        let trunk = 4 + mix.rem_euclid(3) as i32;

        let mut placements = Vec::new();
        for dy in (trunk - 2)..=(trunk + 1) {
            let radius: i32 = if dy > trunk - 1 { 1 } else { 2 };
            for dx in -radius..=radius {
                for dz in -radius..=radius {
                    if dx == 0 && dz == 0 && dy < trunk {
                        continue;
                    }
                    if dx.abs() == radius && dz.abs() == radius && dy == trunk + 1 {
                        continue;
                    }
                    if let Some(pos) = base.checked_offset(dx, dy, dz) {
                        placements.push(BlockPlacement {
                            pos,
                            id: LEAVES,
                            metadata: 0,
                        });
                    }
                }
            }
        }
        for dy in 0..trunk {
            if let Some(pos) = base.checked_offset(0, dy, 0) {
                placements.push(BlockPlacement {
                    pos,
                    id: LOG,
                    metadata: 0,
                });
            }
        }
        placements.retain(|p| p.pos.in_height_range());
        placements
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
