//! Voxel, metadata, and light access by absolute world coordinates.
//!
//! Every call validates `y` once, maps the column to its chunk with floor
//! division, and runs against that chunk under its lock. Reads only load or
//! generate a missing chunk when the caller asks for it; writes always
//! bring the chunk into existence.

use quarry_voxel::block::AIR;
use quarry_voxel::{BlockId, BlockPos, Chunk, ChunkPos, LightPlanes, LocalPos};

use crate::error::WorldError;
use crate::overlay::resting_y;
use crate::world::World;

impl World {
    /// Runs `f` on the chunk at `pos` under its lock, touching its access
    /// time. Retries if the chunk was evicted between lookup and lock.
    pub(crate) fn with_chunk<R>(
        &self,
        pos: ChunkPos,
        generate: bool,
        f: impl FnOnce(&mut Chunk) -> R,
    ) -> Result<R, WorldError> {
        loop {
            let handle = self.acquire(pos, generate).ok_or(WorldError::ChunkUnavailable {
                cx: pos.x,
                cz: pos.z,
            })?;
            let mut chunk = handle.lock();
            if chunk.is_evicted() {
                continue;
            }
            chunk.touch();
            return Ok(f(&mut *chunk));
        }
    }

    /// Voxel type and metadata at `(x, y, z)`.
    pub fn get_block(
        &self,
        x: i32,
        y: i32,
        z: i32,
        generate: bool,
    ) -> Result<(BlockId, u8), WorldError> {
        let (pos, local) = locate(x, y, z)?;
        self.with_chunk(pos.chunk(), generate, |chunk| {
            (chunk.block(local), chunk.metadata(local))
        })
    }

    /// Writes a voxel, generating its chunk if needed, and flags the chunk
    /// for saving and relighting.
    ///
    /// Clearing a voxel to air drops any items floating in the voxel above
    /// it onto the next solid voxel below.
    pub fn set_block(
        &self,
        x: i32,
        y: i32,
        z: i32,
        id: BlockId,
        metadata: u8,
    ) -> Result<(), WorldError> {
        let (pos, local) = locate(x, y, z)?;
        let rest_y = self.with_chunk(pos.chunk(), true, |chunk| {
            chunk.set_block(local, id, metadata);
            (id == AIR).then(|| resting_y(chunk, local))
        })?;

        if let Some(rest_y) = rest_y {
            let moved = self.overlay.settle(pos.offset(0, 1, 0), rest_y);
            if moved > 0 {
                tracing::debug!("{moved} item(s) above ({x}, {y}, {z}) settled at y = {rest_y}");
            }
        }
        Ok(())
    }

    /// `(sky, block)` light at `(x, y, z)`.
    pub fn get_light(
        &self,
        x: i32,
        y: i32,
        z: i32,
        generate: bool,
    ) -> Result<(u8, u8), WorldError> {
        let (pos, local) = locate(x, y, z)?;
        self.with_chunk(pos.chunk(), generate, |chunk| chunk.light(local))
    }

    /// Writes the selected light plane(s) at `(x, y, z)`.
    ///
    /// Runs under the store's structure lock so it never interleaves with a
    /// lighting pass.
    pub fn set_light(
        &self,
        x: i32,
        y: i32,
        z: i32,
        sky: u8,
        block: u8,
        planes: LightPlanes,
    ) -> Result<(), WorldError> {
        let (pos, local) = locate(x, y, z)?;
        self.store.with_structure_lock(|| {
            self.with_chunk(pos.chunk(), true, |chunk| {
                chunk.set_light(local, sky, block, planes)
            })
        })
    }
}

fn locate(x: i32, y: i32, z: i32) -> Result<(BlockPos, LocalPos), WorldError> {
    let pos = BlockPos::new(x, y, z);
    let local = pos.local().ok_or(WorldError::OutOfRange { y })?;
    Ok((pos, local))
}
