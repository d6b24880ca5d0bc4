//! Chunk residency: load, generate, light, save, and evict.
//!
//! [`ChunkStore`] is the only owner of resident chunks. Callers get a shared
//! [`ChunkHandle`] and lock it for the duration of one operation.
//!
//! Locking discipline:
//!
//! * The *structure lock* (re-entrant) serialises creating and evicting
//!   chunks and every lighting pass. Lighting needs re-entrancy because
//!   relighting one chunk may load its neighbours.
//! * Each chunk has its own mutex. A thread holds at most one chunk mutex at
//!   a time and never takes the structure lock while holding one.
//! * An evicted chunk is flagged before it leaves the map, so a caller that
//!   raced with eviction sees the flag and looks the chunk up again.
//! * A generated chunk is hidden from lookups until its first lighting pass
//!   finishes. Lookups that find it hidden wait on the structure lock.
//! * Saves and evictions snapshot a chunk only while holding its mutex with
//!   light known fresh, relighting and retrying if an edit got in between.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dashmap::{DashMap, DashSet};
use parking_lot::{Mutex, ReentrantMutex};
use quarry_lighting::{LightEngine, LightWorld};
use quarry_voxel::{Chunk, ChunkPos, CodecError, LIGHT_DIRTY, SAVE_DIRTY, chunk_path, persist};
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::generator::TerrainGenerator;

/// Shared, lockable access to a resident chunk.
pub type ChunkHandle = Arc<Mutex<Chunk>>;

/// Result of [`ChunkStore::load`].
pub struct Loaded {
    pub handle: ChunkHandle,
    /// First hand-out of this chunk since it became resident.
    pub fresh: bool,
    /// The chunk was generated during this call rather than read from disk.
    pub generated: bool,
}

/// Owns every resident chunk of one world.
pub struct ChunkStore {
    chunks: DashMap<ChunkPos, ChunkHandle, FxBuildHasher>,
    /// Chunks made resident by a lighting pass that no caller has seen yet.
    unannounced: DashSet<ChunkPos, FxBuildHasher>,
    /// Generated chunks whose first lighting pass is still running.
    unlit: DashSet<ChunkPos, FxBuildHasher>,
    structure: ReentrantMutex<()>,
    generator: Arc<dyn TerrainGenerator>,
    lighting: LightEngine,
    world_dir: PathBuf,
}

impl ChunkStore {
    pub fn new(
        world_dir: impl Into<PathBuf>,
        generator: Arc<dyn TerrainGenerator>,
        lighting: LightEngine,
    ) -> Self {
        Self {
            chunks: DashMap::with_hasher(FxBuildHasher),
            unannounced: DashSet::with_hasher(FxBuildHasher),
            unlit: DashSet::with_hasher(FxBuildHasher),
            structure: ReentrantMutex::new(()),
            generator,
            lighting,
            world_dir: world_dir.into(),
        }
    }

    pub fn world_dir(&self) -> &Path {
        &self.world_dir
    }

    pub fn generator(&self) -> &dyn TerrainGenerator {
        self.generator.as_ref()
    }

    /// The handle of a resident chunk, without loading anything. A chunk
    /// still being lit after generation is not yet resident.
    pub fn resident(&self, pos: ChunkPos) -> Option<ChunkHandle> {
        let handle = self.held(pos)?;
        (!self.unlit.contains(&pos)).then_some(handle)
    }

    pub fn is_resident(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos) && !self.unlit.contains(&pos)
    }

    pub fn resident_count(&self) -> usize {
        self.chunks.len()
    }

    /// Positions of all resident chunks.
    pub fn positions(&self) -> Vec<ChunkPos> {
        self.chunks.iter().map(|entry| *entry.key()).collect()
    }

    /// Returns the chunk at `pos`: resident, else read from its file, else
    /// (if `generate`) freshly generated and lit.
    ///
    /// A file that exists but cannot be decoded makes the chunk unavailable;
    /// it is logged and left on disk untouched, and is never replaced by a
    /// generated chunk.
    pub fn load(&self, pos: ChunkPos, generate: bool) -> Option<Loaded> {
        if let Some(handle) = self.resident(pos) {
            return Some(Loaded {
                handle,
                fresh: self.unannounced.remove(&pos).is_some(),
                generated: false,
            });
        }

        let _structure = self.structure.lock();
        if let Some(handle) = self.held(pos) {
            return Some(Loaded {
                handle,
                fresh: self.unannounced.remove(&pos).is_some(),
                generated: false,
            });
        }

        let path = chunk_path(&self.world_dir, pos);
        match Chunk::load(&path, pos) {
            Ok(chunk) => {
                tracing::debug!("loaded chunk ({}, {}) from {}", pos.x, pos.z, path.display());
                return Some(Loaded {
                    handle: self.insert(chunk),
                    fresh: true,
                    generated: false,
                });
            }
            Err(CodecError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    "chunk ({}, {}) unavailable, cannot read {}: {e}",
                    pos.x,
                    pos.z,
                    path.display()
                );
                return None;
            }
        }

        if !generate {
            return None;
        }

        let mut chunk = Chunk::new(pos);
        self.generator.generate(&mut chunk);
        chunk.mark_dirty(SAVE_DIRTY | LIGHT_DIRTY);
        self.unlit.insert(pos);
        let handle = self.insert(chunk);
        self.regenerate_light(pos);
        self.unlit.remove(&pos);
        tracing::debug!("generated chunk ({}, {})", pos.x, pos.z);

        Some(Loaded {
            handle,
            fresh: true,
            generated: true,
        })
    }

    /// [`load`](Self::load) without the generated marker.
    pub fn get_or_load(&self, pos: ChunkPos, generate: bool) -> Option<ChunkHandle> {
        self.load(pos, generate).map(|loaded| loaded.handle)
    }

    /// Runs `f` while holding the structure lock, so no lighting pass,
    /// load, or eviction interleaves with it.
    pub fn with_structure_lock<R>(&self, f: impl FnOnce() -> R) -> R {
        let _structure = self.structure.lock();
        f()
    }

    /// Runs the full three-pass lighting on the chunk at `pos`. Light that
    /// spills over the border raises neighbours that are resident or on
    /// disk; absent neighbours are not generated.
    pub fn regenerate_light(&self, pos: ChunkPos) -> bool {
        let _structure = self.structure.lock();
        let mut world = StoreLight {
            store: self,
            cache: FxHashMap::default(),
        };
        self.lighting.regenerate(pos, &mut world)
    }

    /// Writes the chunk at `pos` if it is resident and dirty, relighting
    /// it first if voxel edits invalidated its light.
    ///
    /// Returns whether a file was written.
    pub fn save(&self, pos: ChunkPos) -> Result<bool, CodecError> {
        let _structure = self.structure.lock();
        let Some(handle) = self.resident(pos) else {
            return Ok(false);
        };

        let root = self.with_fresh_light(pos, &handle, |chunk| {
            if chunk.is_evicted() || !chunk.is_dirty(SAVE_DIRTY) {
                return None;
            }
            chunk.clear_dirty(SAVE_DIRTY);
            Some(chunk.to_nbt())
        });
        let Some(root) = root else {
            return Ok(false);
        };

        if let Err(e) = persist::write_nbt_file(&chunk_path(&self.world_dir, pos), &root) {
            handle.lock().mark_dirty(SAVE_DIRTY);
            return Err(e);
        }
        Ok(true)
    }

    /// Saves every resident dirty chunk. Failures are logged and the chunk
    /// stays dirty. Returns the number of files written.
    pub fn save_all(&self) -> usize {
        let mut saved = 0;
        for pos in self.positions() {
            match self.save(pos) {
                Ok(true) => saved += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!("failed to save chunk ({}, {}): {e}", pos.x, pos.z),
            }
        }
        saved
    }

    /// Saves the chunk if dirty and removes it from residency, dropping its
    /// tile entities with it. If the write fails the chunk stays resident.
    pub fn evict(&self, pos: ChunkPos) -> Result<bool, CodecError> {
        self.evict_where(pos, |_| true)
    }

    /// Evicts every chunk not accessed for at least `max_idle`.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        self.evict_many(|chunk| chunk.idle_for() >= max_idle)
    }

    /// Evicts every resident chunk.
    pub fn evict_all(&self) -> usize {
        self.evict_many(|_| true)
    }

    fn evict_many(&self, should_evict: impl Fn(&Chunk) -> bool) -> usize {
        let mut evicted = 0;
        for pos in self.positions() {
            match self.evict_where(pos, &should_evict) {
                Ok(true) => evicted += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!("failed to evict chunk ({}, {}): {e}", pos.x, pos.z),
            }
        }
        evicted
    }

    fn evict_where(
        &self,
        pos: ChunkPos,
        should_evict: impl Fn(&Chunk) -> bool,
    ) -> Result<bool, CodecError> {
        let _structure = self.structure.lock();
        let Some(handle) = self.resident(pos) else {
            return Ok(false);
        };
        if !should_evict(&*handle.lock()) {
            return Ok(false);
        }

        let root = self.with_fresh_light(pos, &handle, |chunk| {
            chunk.set_evicted(true);
            chunk.is_dirty(SAVE_DIRTY).then(|| chunk.to_nbt())
        });
        self.chunks.remove(&pos);
        self.unannounced.remove(&pos);

        if let Some(root) = root
            && let Err(e) = persist::write_nbt_file(&chunk_path(&self.world_dir, pos), &root)
        {
            handle.lock().set_evicted(false);
            self.chunks.insert(pos, handle);
            return Err(e);
        }

        tracing::debug!("evicted chunk ({}, {})", pos.x, pos.z);
        Ok(true)
    }

    /// Runs `f` under the chunk's mutex once its light is fresh. Stale light
    /// is regenerated with the mutex released, then the flag is checked
    /// again.
    fn with_fresh_light<R>(
        &self,
        pos: ChunkPos,
        handle: &ChunkHandle,
        mut f: impl FnMut(&mut Chunk) -> R,
    ) -> R {
        loop {
            {
                let mut chunk = handle.lock();
                if chunk.is_evicted() || !chunk.is_dirty(LIGHT_DIRTY) {
                    return f(&mut *chunk);
                }
            }
            if !self.regenerate_light(pos) {
                return f(&mut *handle.lock());
            }
        }
    }

    fn held(&self, pos: ChunkPos) -> Option<ChunkHandle> {
        self.chunks.get(&pos).map(|entry| Arc::clone(entry.value()))
    }

    fn insert(&self, chunk: Chunk) -> ChunkHandle {
        let pos = chunk.pos();
        let handle = Arc::new(Mutex::new(chunk));
        self.chunks.insert(pos, Arc::clone(&handle));
        handle
    }
}

/// Lighting's view of the store: loads neighbours from disk but never
/// generates, and remembers each lookup for the length of one pass.
struct StoreLight<'a> {
    store: &'a ChunkStore,
    cache: FxHashMap<ChunkPos, Option<ChunkHandle>>,
}

impl LightWorld for StoreLight<'_> {
    fn with_chunk<R>(&mut self, pos: ChunkPos, f: impl FnOnce(&mut Chunk) -> R) -> Option<R> {
        let store = self.store;
        let handle = self
            .cache
            .entry(pos)
            .or_insert_with(|| {
                let loaded = store.load(pos, false)?;
                if loaded.fresh {
                    store.unannounced.insert(pos);
                }
                Some(loaded.handle)
            })
            .clone()?;
        let mut chunk = handle.lock();
        if chunk.is_evicted() {
            return None;
        }
        Some(f(&mut *chunk))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
