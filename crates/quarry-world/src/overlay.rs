//! Saplings and dropped items: world state that lives beside the chunks.
//!
//! Saplings are kept in [`WorldMeta`](quarry_voxel::WorldMeta) so they
//! survive chunk eviction. Dropped items live in the [`EntityOverlay`]
//! table, keyed by entity id; chunks only hold back-references to the ids
//! currently above them.

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use quarry_voxel::block::{AIR, SAPLING};
use quarry_voxel::{BlockPos, Chunk, LocalPos, SaplingRecord};
use rand::Rng;
use rustc_hash::FxHashMap;

use crate::error::WorldError;
use crate::events::{Recipient, WorldEvent};
use crate::world::World;

/// A position in 1/32-voxel fixed-point units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FixedPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl FixedPos {
    /// Fixed-point units per voxel.
    pub const SCALE: i32 = 32;

    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The horizontal centre of voxel `(x, z)`, resting on the floor of `y`.
    /// `None` if the position does not fit in fixed-point units.
    pub fn centered(x: i32, y: i32, z: i32) -> Option<Self> {
        let fixed = |v: i32| v.checked_mul(Self::SCALE);
        Some(Self {
            x: fixed(x)?.checked_add(15)?,
            y: fixed(y)?,
            z: fixed(z)?.checked_add(15)?,
        })
    }

    /// The voxel containing this position.
    pub fn block(self) -> BlockPos {
        BlockPos::new(
            self.x.div_euclid(Self::SCALE),
            self.y.div_euclid(Self::SCALE),
            self.z.div_euclid(Self::SCALE),
        )
    }
}

/// A dropped item waiting to be picked up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnedItem {
    pub entity_id: u32,
    pub item: i16,
    pub count: i8,
    pub health: i16,
    pub pos: FixedPos,
    pub spawned_by: u32,
    /// World time at spawn.
    pub spawned_at: i64,
}

/// The global dropped-item table.
pub struct EntityOverlay {
    items: Mutex<FxHashMap<u32, SpawnedItem>>,
    next_entity_id: AtomicU32,
}

impl EntityOverlay {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(FxHashMap::default()),
            next_entity_id: AtomicU32::new(1),
        }
    }

    /// Allocates a fresh entity id.
    pub fn next_entity_id(&self) -> u32 {
        self.next_entity_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn insert(&self, item: SpawnedItem) {
        self.items.lock().insert(item.entity_id, item);
    }

    pub fn get(&self, entity_id: u32) -> Option<SpawnedItem> {
        self.items.lock().get(&entity_id).cloned()
    }

    pub fn remove(&self, entity_id: u32) -> Option<SpawnedItem> {
        self.items.lock().remove(&entity_id)
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn clear(&self) {
        self.items.lock().clear();
    }

    /// Ids of items whose voxel lies in the given chunk column.
    pub fn ids_in_chunk(&self, chunk: quarry_voxel::ChunkPos) -> Vec<u32> {
        self.items
            .lock()
            .values()
            .filter(|item| item.pos.block().chunk() == chunk)
            .map(|item| item.entity_id)
            .collect()
    }

    /// Drops every item inside voxel `above` so it rests on `rest_y`.
    /// Returns the number of items moved.
    pub fn settle(&self, above: BlockPos, rest_y: i32) -> usize {
        let mut moved = 0;
        for item in self.items.lock().values_mut() {
            if item.pos.block() == above {
                item.pos.y = rest_y * FixedPos::SCALE;
                moved += 1;
            }
        }
        moved
    }
}

impl Default for EntityOverlay {
    fn default() -> Self {
        Self::new()
    }
}

/// The y an item at `local` comes to rest on: one above the highest
/// non-air voxel at or below it, or the floor if the column is empty.
pub(crate) fn resting_y(chunk: &Chunk, local: LocalPos) -> i32 {
    (0..=local.y())
        .rev()
        .find(|y| {
            LocalPos::new(local.x(), *y, local.z()).is_some_and(|p| chunk.block(p) != AIR)
        })
        .map_or(0, |y| i32::from(y) + 1)
}

impl World {
    /// Records a sapling planted at `(x, y, z)` at the current world time.
    pub fn plant_sapling(&self, x: i32, y: i32, z: i32, planted_by: i32) -> Result<(), WorldError> {
        let pos = BlockPos::new(x, y, z);
        if !pos.in_height_range() {
            return Err(WorldError::OutOfRange { y });
        }
        let mut meta = self.meta.lock();
        let planted_at = meta.time as i32;
        meta.saplings.push(SaplingRecord {
            pos,
            planted_at,
            planted_by,
        });
        tracing::info!("sapling planted at ({x}, {y}, {z}) by {planted_by}");
        Ok(())
    }

    /// Snapshot of the planted saplings.
    pub fn saplings(&self) -> Vec<SaplingRecord> {
        self.meta.lock().saplings.clone()
    }

    /// Gives every sapling an independent `1 / odds` chance to mature.
    /// Matured saplings leave the list and become trees. Returns how many grew.
    pub fn tick_growth(&self) -> usize {
        let odds = self.growth_odds;
        let grown: Vec<SaplingRecord> = {
            let mut rng = rand::rng();
            let mut meta = self.meta.lock();
            let mut grown = Vec::new();
            meta.saplings.retain(|sapling| {
                if rng.random_ratio(1, odds) {
                    grown.push(*sapling);
                    false
                } else {
                    true
                }
            });
            grown
        };

        for sapling in &grown {
            let p = sapling.pos;
            tracing::info!("sapling at ({}, {}, {}) grew into a tree", p.x, p.y, p.z);
            self.grow_tree(p);
        }
        grown.len()
    }

    /// Writes the generator's tree at `base` into air (and the sapling itself).
    fn grow_tree(&self, base: BlockPos) {
        for placement in self.store.generator().grow_tree(base) {
            let p = placement.pos;
            match self.get_block(p.x, p.y, p.z, true) {
                Ok((id, _)) if id == AIR || id == SAPLING => {
                    if let Err(e) = self.set_block(p.x, p.y, p.z, placement.id, placement.metadata)
                    {
                        tracing::warn!("tree block at ({}, {}, {}) not placed: {e}", p.x, p.y, p.z);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("tree block at ({}, {}, {}) skipped: {e}", p.x, p.y, p.z),
            }
        }
    }

    /// Drops an item at `(x, y, z)`. If that voxel is air the item falls to
    /// rest one above the first solid voxel beneath it. Returns the new
    /// entity id.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn_pickup(
        &self,
        x: i32,
        y: i32,
        z: i32,
        item: i16,
        count: i8,
        health: i16,
        spawned_by: u32,
    ) -> Result<u32, WorldError> {
        let target = BlockPos::new(x, y, z);
        let local = target.local().ok_or(WorldError::OutOfRange { y })?;
        let chunk_pos = target.chunk();
        let column = FixedPos::centered(x, 0, z).ok_or(WorldError::BeyondItemRange { x, z })?;

        let rest_y = self.with_chunk(chunk_pos, true, |chunk| {
            if chunk.block(local) == AIR {
                resting_y(chunk, local)
            } else {
                y
            }
        })?;

        let pos = FixedPos::new(column.x, rest_y * FixedPos::SCALE, column.z);
        let entity_id = self.overlay.next_entity_id();
        self.overlay.insert(SpawnedItem {
            entity_id,
            item,
            count,
            health,
            pos,
            spawned_by,
            spawned_at: self.time(),
        });
        if let Some(handle) = self.store.resident(chunk_pos) {
            handle.lock().add_pending_item(entity_id);
        }

        self.sink.deliver(
            Recipient::Watchers(chunk_pos),
            WorldEvent::PickupSpawned {
                entity_id,
                item,
                count,
                health,
                pos,
            },
        );
        Ok(entity_id)
    }

    /// Removes a dropped item (picked up or despawned).
    pub fn remove_item(&self, entity_id: u32) -> Option<SpawnedItem> {
        let item = self.overlay.remove(entity_id)?;
        if let Some(handle) = self.store.resident(item.pos.block().chunk()) {
            handle.lock().remove_pending_item(entity_id);
        }
        Some(item)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
