//! The world facade: the operations the rest of the server calls.
//!
//! [`World`] composes the chunk store, the entity overlay, and the world
//! metadata, and pushes outbound messages through an [`EventSink`]. Voxel
//! access lives in `access.rs` and sapling/item handling in `overlay.rs`.
//!
//! Lock order is structure lock, then metadata, then one chunk. The
//! metadata lock is never held while a chunk is being acquired.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use quarry_config::Config;
use quarry_lighting::LightEngine;
use quarry_voxel::block::AIR;
use quarry_voxel::{
    BlockId, BlockPos, CHUNK_HEIGHT, CHUNK_WIDTH, ChunkPos, CodecError, LIGHT_DIRTY, LightTables,
    LocalPos, Lock, TileEntity, WorldMeta, deflate, level_path,
};

use crate::error::WorldError;
use crate::events::{ClientId, EventSink, Recipient, WorldEvent};
use crate::generator::TerrainGenerator;
use crate::overlay::EntityOverlay;
use crate::store::{ChunkHandle, ChunkStore};

/// A loaded world.
pub struct World {
    pub(crate) store: ChunkStore,
    pub(crate) overlay: EntityOverlay,
    pub(crate) meta: Mutex<WorldMeta>,
    pub(crate) sink: Arc<dyn EventSink>,
    pub(crate) growth_odds: u32,
    level_path: PathBuf,
    spawn_floor: i32,
    lock_by_default: bool,
}

impl World {
    /// Opens the world in `config.storage.world_dir`, creating the directory
    /// and a fresh `level.dat` (random seed, configured spawn) if needed.
    ///
    /// Failing to create the directory or the initial metadata file is a
    /// [`WorldError::StartupIo`].
    pub fn open(
        config: &Config,
        mut generator: Box<dyn TerrainGenerator>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, WorldError> {
        let world_dir = PathBuf::from(&config.storage.world_dir);
        fs::create_dir_all(&world_dir).map_err(|source| WorldError::StartupIo {
            path: world_dir.clone(),
            source,
        })?;

        let level_path = level_path(&world_dir);
        let meta = match WorldMeta::load(&level_path) {
            Ok(meta) => {
                tracing::info!("opened world {} (seed {})", world_dir.display(), meta.seed);
                meta
            }
            Err(CodecError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!("{} not found, creating a new world", level_path.display());
                let spawn = config.world.default_spawn;
                let spawn = BlockPos::new(spawn.x, spawn.y, spawn.z);
                let meta = WorldMeta::new(rand::random(), spawn);
                meta.save(&level_path)
                    .map_err(|e| startup_error(&level_path, e))?;
                meta
            }
            Err(e) => return Err(e.into()),
        };

        generator.init(meta.seed);
        let store = ChunkStore::new(
            world_dir,
            Arc::from(generator),
            LightEngine::new(LightTables::classic()),
        );

        Ok(Self {
            store,
            overlay: EntityOverlay::new(),
            meta: Mutex::new(meta),
            sink,
            growth_odds: config.world.sapling_growth_odds.max(1),
            level_path,
            spawn_floor: config.world.spawn_search_floor,
            lock_by_default: config.world.chests_locked_by_default,
        })
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn overlay(&self) -> &EntityOverlay {
        &self.overlay
    }

    /// Snapshot of the world metadata.
    pub fn meta(&self) -> WorldMeta {
        self.meta.lock().clone()
    }

    pub fn spawn(&self) -> BlockPos {
        self.meta.lock().spawn
    }

    pub fn seed(&self) -> i64 {
        self.meta.lock().seed
    }

    /// Elapsed world time in ticks.
    pub fn time(&self) -> i64 {
        self.meta.lock().time
    }

    pub fn advance_time(&self, ticks: i64) {
        self.meta.lock().time += ticks;
    }

    /// Resolves a chunk through the store, then does the bookkeeping a newly
    /// resident chunk needs: re-attaching item back-references and lifting
    /// spawn onto freshly generated ground.
    pub(crate) fn acquire(&self, pos: ChunkPos, generate: bool) -> Option<ChunkHandle> {
        let loaded = self.store.load(pos, generate)?;
        if loaded.fresh {
            let items = self.overlay.ids_in_chunk(pos);
            if !items.is_empty() {
                let mut chunk = loaded.handle.lock();
                for id in items {
                    chunk.add_pending_item(id);
                }
            }
        }
        if loaded.generated && pos == self.spawn().chunk() {
            self.lift_spawn(&loaded.handle);
        }
        Some(loaded.handle)
    }

    /// If the spawn voxel is air, moves spawn down to rest on the first
    /// solid voxel above the search floor and persists the change.
    fn lift_spawn(&self, handle: &ChunkHandle) {
        let spawn = self.spawn();
        let Some(local) = spawn.local() else {
            return;
        };
        let floor = self.spawn_floor;
        let ground = {
            let chunk = handle.lock();
            if chunk.block(local) != AIR {
                return;
            }
            ((floor + 1)..=spawn.y).rev().find(|y| {
                u8::try_from(*y)
                    .ok()
                    .and_then(|y| LocalPos::new(local.x(), y, local.z()))
                    .is_some_and(|p| chunk.block(p) != AIR)
            })
        };
        let Some(ground) = ground else {
            return;
        };

        let new_y = ground + 1;
        self.meta.lock().spawn.y = new_y;
        tracing::info!("spawn moved to ({}, {}, {})", spawn.x, new_y, spawn.z);
        if let Err(e) = self.save_meta() {
            tracing::warn!("failed to persist lifted spawn: {e}");
        }
    }

    /// Sends a full chunk to one client: a pre-chunk notice, the compressed
    /// chunk data, and the text of every sign in it. Relights first if the
    /// chunk's light is stale.
    pub fn send_chunk(&self, client: ClientId, cx: i32, cz: i32) -> Result<(), WorldError> {
        let pos = ChunkPos::new(cx, cz);
        let (ox, oz) = pos
            .checked_origin()
            .ok_or(WorldError::ChunkUnavailable { cx, cz })?;
        let stale = self.with_chunk(pos, true, |chunk| chunk.is_dirty(LIGHT_DIRTY))?;
        if stale {
            self.store.regenerate_light(pos);
        }

        let (raw, signs) = self.with_chunk(pos, true, |chunk| {
            (chunk.network_payload(), chunk.signs().cloned().collect::<Vec<_>>())
        })?;
        let payload = deflate(&raw)?;

        let to = Recipient::Client(client);
        self.sink.deliver(to, WorldEvent::PreChunk { pos });
        self.sink.deliver(
            to,
            WorldEvent::ChunkData {
                origin: BlockPos::new(ox, 0, oz),
                size: (CHUNK_WIDTH as u8, CHUNK_HEIGHT as u8, CHUNK_WIDTH as u8),
                payload,
            },
        );
        for sign in signs {
            self.sink.deliver(
                to,
                WorldEvent::SignText {
                    pos: sign.pos,
                    lines: sign.lines,
                },
            );
        }
        Ok(())
    }

    /// Tells watchers of the owning chunk that a voxel changed. Nothing is
    /// sent if that chunk is not resident. Returns whether a message went out.
    pub fn send_block_change(
        &self,
        x: i32,
        y: i32,
        z: i32,
        id: BlockId,
        metadata: u8,
    ) -> Result<bool, WorldError> {
        let pos = BlockPos::new(x, y, z);
        if !pos.in_height_range() {
            return Err(WorldError::OutOfRange { y });
        }
        let chunk = pos.chunk();
        if !self.store.is_resident(chunk) {
            return Ok(false);
        }
        self.sink.deliver(
            Recipient::Watchers(chunk),
            WorldEvent::BlockChange { pos, id, metadata },
        );
        Ok(true)
    }

    /// Stores a sign, chest, or furnace at its position, replacing whatever
    /// was there. The owning chunk is loaded or generated as needed.
    ///
    /// `placed_by` names the player making the change, if any. A locked
    /// container can only be replaced by its owner and keeps its lock when
    /// the replacement carries none. A container newly placed by a player
    /// is owned by them, locked if the world locks containers by default.
    pub fn set_tile_entity(
        &self,
        mut entity: TileEntity,
        placed_by: Option<&str>,
    ) -> Result<(), WorldError> {
        let pos = entity.pos();
        if !pos.in_height_range() {
            return Err(WorldError::OutOfRange { y: pos.y });
        }
        let lock_by_default = self.lock_by_default;
        self.with_chunk(pos.chunk(), true, |chunk| {
            let existing = chunk.tile_entity(pos).map(|e| e.lock().cloned());
            if let Some(Some(lock)) = &existing
                && !lock.permits(placed_by)
            {
                tracing::debug!(
                    "refused to replace tile entity at ({}, {}, {}) owned by {}",
                    pos.x,
                    pos.y,
                    pos.z,
                    lock.owner
                );
                return Err(WorldError::Locked {
                    x: pos.x,
                    y: pos.y,
                    z: pos.z,
                });
            }
            if let Some(slot) = entity.lock_slot_mut()
                && slot.is_none()
            {
                *slot = match (existing, placed_by) {
                    (Some(previous), _) => previous,
                    (None, Some(player)) => Some(Lock::new(player, lock_by_default)),
                    (None, None) => None,
                };
            }
            chunk.insert_tile_entity(entity);
            Ok(())
        })?
    }

    /// The tile entity at `pos`, if its chunk can be loaded without generating.
    pub fn tile_entity_at(&self, pos: BlockPos) -> Result<Option<TileEntity>, WorldError> {
        if !pos.in_height_range() {
            return Err(WorldError::OutOfRange { y: pos.y });
        }
        self.with_chunk(pos.chunk(), false, |chunk| chunk.tile_entity(pos).cloned())
    }

    pub fn remove_tile_entity(&self, pos: BlockPos) -> Result<Option<TileEntity>, WorldError> {
        if !pos.in_height_range() {
            return Err(WorldError::OutOfRange { y: pos.y });
        }
        self.with_chunk(pos.chunk(), false, |chunk| chunk.remove_tile_entity(pos))
    }

    /// Writes `level.dat`.
    pub fn save_meta(&self) -> Result<(), WorldError> {
        let meta = self.meta.lock();
        meta.save(&self.level_path)?;
        Ok(())
    }

    /// Saves every dirty chunk, then the world metadata. Returns the number
    /// of chunk files written.
    pub fn save_all(&self) -> Result<usize, WorldError> {
        let saved = self.store.save_all();
        self.save_meta()?;
        tracing::info!(
            "saved {saved} chunk(s), {} resident, world time {}",
            self.store.resident_count(),
            self.time()
        );
        Ok(saved)
    }

    /// Evicts (and so saves) every chunk, drops all item records, and
    /// writes the world metadata.
    pub fn shutdown(&self) -> Result<(), WorldError> {
        let evicted = self.store.evict_all();
        self.overlay.clear();
        self.save_meta()?;
        tracing::info!("world shut down, {evicted} chunk(s) written back");
        Ok(())
    }

    pub fn level_path(&self) -> &Path {
        &self.level_path
    }
}

fn startup_error(path: &Path, error: CodecError) -> WorldError {
    match error {
        CodecError::Io(source) => WorldError::StartupIo {
            path: path.to_path_buf(),
            source,
        },
        other => WorldError::Codec(other),
    }
}
