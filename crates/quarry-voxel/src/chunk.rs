//! The chunk data unit: a 16×128×16 voxel column group.
//!
//! A [`Chunk`] owns its voxel bytes, the nibble-packed metadata and light
//! planes, the per-column height map, and the tile entities placed inside it.
//! All addressing goes through [`LocalPos`], which is range-checked once when
//! it is built, so the accessors here never re-validate.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::block::{AIR, BlockId};
use crate::coords::{BlockPos, CHUNK_VOLUME, ChunkPos, LocalPos, column_index};
use crate::nibble::NibbleArray;
use crate::tile_entity::{Sign, TileEntity};

/// Number of columns in a chunk (16 × 16).
pub const HEIGHTMAP_LEN: usize = 256;

/// Dirty-flag bit: chunk has changes not yet written to disk.
pub const SAVE_DIRTY: u8 = 0b0000_0001;
/// Dirty-flag bit: voxel edits invalidated the light planes.
pub const LIGHT_DIRTY: u8 = 0b0000_0010;

/// Which light plane(s) a light write touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightPlanes {
    Sky,
    Block,
    Both,
}

impl LightPlanes {
    pub fn includes_sky(self) -> bool {
        matches!(self, LightPlanes::Sky | LightPlanes::Both)
    }

    pub fn includes_block(self) -> bool {
        matches!(self, LightPlanes::Block | LightPlanes::Both)
    }
}

/// A resident chunk of the world.
#[derive(Clone, Debug)]
pub struct Chunk {
    pos: ChunkPos,
    blocks: Box<[u8]>,
    metadata: NibbleArray,
    skylight: NibbleArray,
    blocklight: NibbleArray,
    heightmap: [u8; HEIGHTMAP_LEN],
    tile_entities: BTreeMap<BlockPos, TileEntity>,
    /// Ids of dropped items currently over this chunk. Not authoritative.
    pending_items: Vec<u32>,
    dirty: u8,
    last_accessed: Instant,
    evicted: bool,
}

impl Chunk {
    /// Creates an all-air, unlit chunk at `pos`.
    pub fn new(pos: ChunkPos) -> Self {
        Self {
            pos,
            blocks: vec![AIR; CHUNK_VOLUME].into_boxed_slice(),
            metadata: NibbleArray::new(),
            skylight: NibbleArray::new(),
            blocklight: NibbleArray::new(),
            heightmap: [0; HEIGHTMAP_LEN],
            tile_entities: BTreeMap::new(),
            pending_items: Vec::new(),
            dirty: 0,
            last_accessed: Instant::now(),
            evicted: false,
        }
    }

    /// Assembles a chunk from already length-checked planes.
    pub(crate) fn from_planes(
        pos: ChunkPos,
        blocks: Box<[u8]>,
        metadata: NibbleArray,
        skylight: NibbleArray,
        blocklight: NibbleArray,
        heightmap: [u8; HEIGHTMAP_LEN],
    ) -> Self {
        debug_assert_eq!(blocks.len(), CHUNK_VOLUME);
        Self {
            blocks,
            metadata,
            skylight,
            blocklight,
            heightmap,
            ..Self::new(pos)
        }
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    // -- voxels -------------------------------------------------------------

    /// Voxel type at `local`.
    #[inline]
    pub fn block(&self, local: LocalPos) -> BlockId {
        self.blocks[local.index()]
    }

    /// Metadata nibble at `local`.
    #[inline]
    pub fn metadata(&self, local: LocalPos) -> u8 {
        self.metadata.get(local.index())
    }

    /// Writes a voxel and its metadata. Marks the chunk for saving and
    /// for light regeneration.
    pub fn set_block(&mut self, local: LocalPos, id: BlockId, metadata: u8) {
        let index = local.index();
        self.blocks[index] = id;
        self.metadata.set(index, metadata);
        self.dirty |= SAVE_DIRTY | LIGHT_DIRTY;
    }

    /// Highest non-air voxel in column `(x, z)`, if any.
    pub fn top_non_air(&self, x: u8, z: u8) -> Option<u8> {
        let base = LocalPos::new(x, 0, z)?.index();
        self.blocks[base..base + crate::coords::CHUNK_HEIGHT]
            .iter()
            .rposition(|b| *b != AIR)
            .map(|y| y as u8)
    }

    // -- light --------------------------------------------------------------

    #[inline]
    pub fn sky_light(&self, local: LocalPos) -> u8 {
        self.skylight.get(local.index())
    }

    #[inline]
    pub fn block_light(&self, local: LocalPos) -> u8 {
        self.blocklight.get(local.index())
    }

    /// `(sky, block)` light at `local`.
    #[inline]
    pub fn light(&self, local: LocalPos) -> (u8, u8) {
        let index = local.index();
        (self.skylight.get(index), self.blocklight.get(index))
    }

    /// Writes the selected light plane(s) at `local`.
    pub fn set_light(&mut self, local: LocalPos, sky: u8, block: u8, planes: LightPlanes) {
        let index = local.index();
        if planes.includes_sky() {
            self.skylight.set(index, sky);
        }
        if planes.includes_block() {
            self.blocklight.set(index, block);
        }
        self.dirty |= SAVE_DIRTY;
    }

    /// Zeroes both light planes.
    pub fn clear_light(&mut self) {
        self.skylight.clear();
        self.blocklight.clear();
        self.dirty |= SAVE_DIRTY;
    }

    /// Height-map entry for column `(x, z)`; `x` and `z` are masked to `0..16`.
    pub fn height(&self, x: u8, z: u8) -> u8 {
        self.heightmap[column_index(x & 0x0F, z & 0x0F)]
    }

    pub fn set_height(&mut self, x: u8, z: u8, height: u8) {
        self.heightmap[column_index(x & 0x0F, z & 0x0F)] = height;
    }

    // -- raw planes ---------------------------------------------------------

    pub fn blocks(&self) -> &[u8] {
        &self.blocks
    }

    pub fn metadata_plane(&self) -> &NibbleArray {
        &self.metadata
    }

    pub fn skylight_plane(&self) -> &NibbleArray {
        &self.skylight
    }

    pub fn blocklight_plane(&self) -> &NibbleArray {
        &self.blocklight
    }

    pub fn heightmap(&self) -> &[u8; HEIGHTMAP_LEN] {
        &self.heightmap
    }

    // -- tile entities ------------------------------------------------------

    pub fn tile_entity(&self, pos: BlockPos) -> Option<&TileEntity> {
        self.tile_entities.get(&pos)
    }

    /// Mutable access to a tile entity. Marks the chunk for saving.
    pub fn tile_entity_mut(&mut self, pos: BlockPos) -> Option<&mut TileEntity> {
        let entity = self.tile_entities.get_mut(&pos)?;
        self.dirty |= SAVE_DIRTY;
        Some(entity)
    }

    /// Stores `entity` at its position, replacing any previous record there.
    ///
    /// Returns `false` (and stores nothing) if the position is not inside
    /// this chunk.
    pub fn insert_tile_entity(&mut self, entity: TileEntity) -> bool {
        let pos = entity.pos();
        if pos.chunk() != self.pos || !pos.in_height_range() {
            tracing::warn!(
                "tile entity at ({}, {}, {}) does not belong to chunk ({}, {})",
                pos.x,
                pos.y,
                pos.z,
                self.pos.x,
                self.pos.z
            );
            return false;
        }
        self.tile_entities.insert(pos, entity);
        self.dirty |= SAVE_DIRTY;
        true
    }

    pub fn remove_tile_entity(&mut self, pos: BlockPos) -> Option<TileEntity> {
        let removed = self.tile_entities.remove(&pos);
        if removed.is_some() {
            self.dirty |= SAVE_DIRTY;
        }
        removed
    }

    /// All tile entities, ordered by position.
    pub fn tile_entities(&self) -> impl Iterator<Item = &TileEntity> {
        self.tile_entities.values()
    }

    pub fn signs(&self) -> impl Iterator<Item = &Sign> {
        self.tile_entities.values().filter_map(|e| match e {
            TileEntity::Sign(sign) => Some(sign),
            _ => None,
        })
    }

    // -- item back-references -----------------------------------------------

    pub fn pending_items(&self) -> &[u32] {
        &self.pending_items
    }

    pub fn add_pending_item(&mut self, entity_id: u32) {
        if !self.pending_items.contains(&entity_id) {
            self.pending_items.push(entity_id);
        }
    }

    pub fn remove_pending_item(&mut self, entity_id: u32) {
        self.pending_items.retain(|id| *id != entity_id);
    }

    // -- bookkeeping --------------------------------------------------------

    pub fn dirty_flags(&self) -> u8 {
        self.dirty
    }

    /// Returns `true` if every bit of `flag` is set.
    pub fn is_dirty(&self, flag: u8) -> bool {
        self.dirty & flag == flag
    }

    pub fn mark_dirty(&mut self, flags: u8) {
        self.dirty |= flags;
    }

    pub fn clear_dirty(&mut self, flags: u8) {
        self.dirty &= !flags;
    }

    /// Records an access for idle-eviction purposes.
    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }

    pub fn last_accessed(&self) -> Instant {
        self.last_accessed
    }

    pub fn idle_for(&self) -> Duration {
        self.last_accessed.elapsed()
    }

    /// Whether this chunk has been removed from residency. A handle to an
    /// evicted chunk is stale and must be looked up again.
    pub fn is_evicted(&self) -> bool {
        self.evicted
    }

    pub fn set_evicted(&mut self, evicted: bool) {
        self.evicted = evicted;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{GLOWSTONE, STONE};
    use crate::tile_entity::Chest;

    fn local(x: u8, y: u8, z: u8) -> LocalPos {
        LocalPos::new(x, y, z).expect("valid local position")
    }

    #[test]
    fn test_new_chunk_is_clean_air() {
        let chunk = Chunk::new(ChunkPos::new(2, -3));
        assert_eq!(chunk.block(local(5, 64, 5)), AIR);
        assert_eq!(chunk.dirty_flags(), 0);
        assert_eq!(chunk.top_non_air(5, 5), None);
    }

    #[test]
    fn test_set_block_both_parities() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0));
        chunk.set_block(local(3, 10, 4), STONE, 0x7);
        chunk.set_block(local(3, 11, 4), GLOWSTONE, 0xC);
        assert_eq!(chunk.block(local(3, 10, 4)), STONE);
        assert_eq!(chunk.metadata(local(3, 10, 4)), 0x7);
        assert_eq!(chunk.block(local(3, 11, 4)), GLOWSTONE);
        assert_eq!(chunk.metadata(local(3, 11, 4)), 0xC);
        assert!(chunk.is_dirty(SAVE_DIRTY | LIGHT_DIRTY));
    }

    #[test]
    fn test_light_planes_are_independent() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0));
        let p = local(0, 5, 0);
        chunk.set_light(p, 12, 3, LightPlanes::Both);
        chunk.set_light(p, 1, 9, LightPlanes::Block);
        assert_eq!(chunk.light(p), (12, 9));
        chunk.set_light(p, 4, 0, LightPlanes::Sky);
        assert_eq!(chunk.light(p), (4, 9));
        assert!(!chunk.is_dirty(LIGHT_DIRTY));
    }

    #[test]
    fn test_top_non_air() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0));
        chunk.set_block(local(1, 0, 1), STONE, 0);
        chunk.set_block(local(1, 40, 1), STONE, 0);
        assert_eq!(chunk.top_non_air(1, 1), Some(40));
        chunk.set_block(local(1, 127, 1), STONE, 0);
        assert_eq!(chunk.top_non_air(1, 1), Some(127));
    }

    #[test]
    fn test_tile_entity_must_be_inside_chunk() {
        let mut chunk = Chunk::new(ChunkPos::new(1, 0));
        let outside = TileEntity::Chest(Chest::new(BlockPos::new(3, 64, 3)));
        assert!(!chunk.insert_tile_entity(outside));
        assert_eq!(chunk.tile_entities().count(), 0);

        let inside = TileEntity::Chest(Chest::new(BlockPos::new(19, 64, 3)));
        assert!(chunk.insert_tile_entity(inside.clone()));
        assert_eq!(chunk.tile_entity(BlockPos::new(19, 64, 3)), Some(&inside));
        assert!(chunk.remove_tile_entity(BlockPos::new(19, 64, 3)).is_some());
        assert!(chunk.tile_entity(BlockPos::new(19, 64, 3)).is_none());
    }

    #[test]
    fn test_pending_items_deduplicate() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0));
        chunk.add_pending_item(7);
        chunk.add_pending_item(7);
        chunk.add_pending_item(8);
        assert_eq!(chunk.pending_items(), &[7, 8]);
        chunk.remove_pending_item(7);
        assert_eq!(chunk.pending_items(), &[8]);
    }
}
