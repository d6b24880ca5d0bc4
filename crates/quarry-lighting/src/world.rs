//! The seam between the lighting engine and whoever owns the chunks.
//!
//! Light crosses chunk borders, so the engine never holds chunks itself. It
//! asks a [`LightWorld`] for one chunk at a time, by position, for the
//! duration of a closure. An implementation may load neighbours on demand
//! but must not generate new terrain; a chunk it cannot provide simply stops
//! that branch of the fill.

use quarry_voxel::{BlockId, BlockPos, Chunk, ChunkPos, LightPlanes};

/// Chunk access for light propagation.
pub trait LightWorld {
    /// Runs `f` on the chunk at `pos`, or returns `None` if that chunk is
    /// not resident and cannot be loaded from disk.
    fn with_chunk<R>(&mut self, pos: ChunkPos, f: impl FnOnce(&mut Chunk) -> R) -> Option<R>;

    /// `(type, sky, block)` at `pos`, or `None` if out of range or unavailable.
    fn voxel(&mut self, pos: BlockPos) -> Option<(BlockId, u8, u8)> {
        let local = pos.local()?;
        self.with_chunk(pos.chunk(), |chunk| {
            let (sky, block) = chunk.light(local);
            (chunk.block(local), sky, block)
        })
    }

    /// Writes light at `pos`. Returns `false` if out of range or unavailable.
    fn set_light(&mut self, pos: BlockPos, sky: u8, block: u8, planes: LightPlanes) -> bool {
        let Some(local) = pos.local() else {
            return false;
        };
        self.with_chunk(pos.chunk(), |chunk| chunk.set_light(local, sky, block, planes))
            .is_some()
    }
}
