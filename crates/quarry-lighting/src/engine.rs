//! Skylight and block-light computation.
//!
//! A chunk is lit in three passes, each finishing before the next starts:
//!
//! 1. **Skylight.** Both planes are cleared. Each column receives level 15
//!    from above and loses each voxel's opacity on the way down; values are
//!    written straight down until the light is used up. The height map is
//!    rebuilt from each column's topmost non-air voxel.
//! 2. **Emission.** From each column's topmost non-air voxel down to the
//!    floor, every emitter seeds its own block light.
//! 3. **Spread.** From each column's height-map entry down to the floor,
//!    every lit voxel floods its light into its six neighbours.
//!
//! The flood fill loses `1 + opacity` per hop and only ever raises levels,
//! so it converges to the brightest level reachable from current sources.
//! It never darkens anything: removing a source requires regenerating the
//! chunk.

use std::collections::VecDeque;
use std::time::Instant;

use quarry_voxel::block::AIR;
use quarry_voxel::{
    BlockPos, CHUNK_WIDTH, Chunk, ChunkPos, LIGHT_DIRTY, LightPlanes, LightTables, LocalPos,
    MAX_LIGHT, MAX_Y,
};

use crate::world::LightWorld;

/// The six axis-aligned neighbour offsets.
const NEIGHBORS_6: [(i32, i32, i32); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// Computes light for chunks reachable through a [`LightWorld`].
#[derive(Clone, Debug, Default)]
pub struct LightEngine {
    tables: LightTables,
}

impl LightEngine {
    pub fn new(tables: LightTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &LightTables {
        &self.tables
    }

    /// Recomputes both light planes and the height map of the chunk at
    /// `pos`. Its [`LIGHT_DIRTY`] flag is cleared as the pass starts, so an
    /// edit made while light spreads marks the chunk stale again.
    ///
    /// Light spilling over the border raises neighbouring chunks that `world`
    /// can provide. Returns `false` if the chunk itself is unavailable.
    pub fn regenerate<W: LightWorld>(&self, pos: ChunkPos, world: &mut W) -> bool {
        let start = Instant::now();

        let Some(heights) = world.with_chunk(pos, |chunk| {
            chunk.clear_dirty(LIGHT_DIRTY);
            self.skylight_pass(chunk);
            self.emission_pass(chunk);
            *chunk.heightmap()
        }) else {
            return false;
        };

        let mut queue = VecDeque::new();
        for x in 0..CHUNK_WIDTH as u8 {
            for z in 0..CHUNK_WIDTH as u8 {
                let top = heights[quarry_voxel::coords::column_index(x, z)];
                for y in (0..=top).rev() {
                    let Some(local) = LocalPos::new(x, y, z) else {
                        continue;
                    };
                    let origin = pos.block_at(local);
                    if let Some((_, sky, block)) = world.voxel(origin)
                        && (sky > 0 || block > 0)
                    {
                        queue.push_back((origin, sky, block));
                        self.drain(&mut queue, world);
                    }
                }
            }
        }

        tracing::trace!(
            "relit chunk ({}, {}) in {:.2?}",
            pos.x,
            pos.z,
            start.elapsed()
        );
        true
    }

    /// Floods `(sky, block)` light outward from `origin`.
    ///
    /// Each neighbour's candidate level per plane is the incoming level minus
    /// the neighbour's opacity minus one, floored at zero. A neighbour whose
    /// candidates do not beat its stored levels is left alone and not
    /// expanded further. Neighbours the world cannot provide are skipped.
    pub fn spread<W: LightWorld>(&self, origin: BlockPos, sky: u8, block: u8, world: &mut W) {
        let mut queue = VecDeque::from([(origin, sky.min(MAX_LIGHT), block.min(MAX_LIGHT))]);
        self.drain(&mut queue, world);
    }

    fn drain<W: LightWorld>(&self, queue: &mut VecDeque<(BlockPos, u8, u8)>, world: &mut W) {
        while let Some((pos, sky, block)) = queue.pop_front() {
            for (dx, dy, dz) in NEIGHBORS_6 {
                if (dy > 0 && pos.y >= MAX_Y) || (dy < 0 && pos.y <= 0) {
                    continue;
                }
                let Some(next) = pos.checked_offset(dx, dy, dz) else {
                    continue;
                };
                let Some(local) = next.local() else {
                    continue;
                };
                let raised = world
                    .with_chunk(next.chunk(), |chunk| self.raise(chunk, local, sky, block))
                    .flatten();
                if let Some((s, b)) = raised {
                    queue.push_back((next, s, b));
                }
            }
        }
    }

    /// Applies incoming light to one voxel. Returns its new levels if either
    /// plane went up.
    fn raise(&self, chunk: &mut Chunk, local: LocalPos, sky: u8, block: u8) -> Option<(u8, u8)> {
        let cost = self.tables.opacity(chunk.block(local)).saturating_add(1);
        let candidate_sky = sky.saturating_sub(cost);
        let candidate_block = block.saturating_sub(cost);
        let (current_sky, current_block) = chunk.light(local);
        if candidate_sky <= current_sky && candidate_block <= current_block {
            return None;
        }
        let new_sky = candidate_sky.max(current_sky);
        let new_block = candidate_block.max(current_block);
        chunk.set_light(local, new_sky, new_block, LightPlanes::Both);
        Some((new_sky, new_block))
    }

    fn skylight_pass(&self, chunk: &mut Chunk) {
        chunk.clear_light();
        for x in 0..CHUNK_WIDTH as u8 {
            for z in 0..CHUNK_WIDTH as u8 {
                let height = match chunk.top_non_air(x, z) {
                    Some(top) => (top + 1).min(MAX_Y as u8),
                    None => 0,
                };
                chunk.set_height(x, z, height);

                let mut light = MAX_LIGHT;
                for y in (1..=MAX_Y as u8).rev() {
                    let Some(local) = LocalPos::new(x, y, z) else {
                        continue;
                    };
                    light = light.saturating_sub(self.tables.opacity(chunk.block(local)));
                    if light == 0 {
                        break;
                    }
                    chunk.set_light(local, light, 0, LightPlanes::Sky);
                }
            }
        }
    }

    fn emission_pass(&self, chunk: &mut Chunk) {
        for x in 0..CHUNK_WIDTH as u8 {
            for z in 0..CHUNK_WIDTH as u8 {
                let Some(top) = chunk.top_non_air(x, z) else {
                    continue;
                };
                for y in (0..=top).rev() {
                    let Some(local) = LocalPos::new(x, y, z) else {
                        continue;
                    };
                    let id = chunk.block(local);
                    if id == AIR {
                        continue;
                    }
                    let emission = self.tables.emission(id);
                    if emission > 0 {
                        chunk.set_light(local, 0, emission, LightPlanes::Block);
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
