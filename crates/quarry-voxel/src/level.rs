//! World metadata: elapsed time, seed, spawn point, and planted saplings.
//!
//! Persisted as `level.dat`, a gzip NBT root with a `Data` compound
//! (`Time`, `SpawnX`/`SpawnY`/`SpawnZ`, `RandomSeed`) and a `Trees` list of
//! `{X, Y, Z, plantedTime, plantedBy}` records. Saving merges into the
//! existing file so fields written by other tools survive.

use std::path::Path;

use quartz_nbt::{NbtCompound, NbtList, NbtTag};

use crate::coords::BlockPos;
use crate::error::CodecError;
use crate::persist;

/// A planted sapling waiting to grow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaplingRecord {
    pub pos: BlockPos,
    /// World time when planted.
    pub planted_at: i32,
    /// Id of the user who planted it.
    pub planted_by: i32,
}

/// World-global state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorldMeta {
    /// Elapsed world time in ticks.
    pub time: i64,
    pub seed: i64,
    pub spawn: BlockPos,
    pub saplings: Vec<SaplingRecord>,
}

impl WorldMeta {
    /// Fresh metadata at time zero with no saplings.
    pub fn new(seed: i64, spawn: BlockPos) -> Self {
        Self {
            time: 0,
            seed,
            spawn,
            saplings: Vec::new(),
        }
    }

    /// Writes this metadata into `base`, keeping unrelated fields of `base`.
    pub fn merge_into(&self, mut base: NbtCompound) -> NbtCompound {
        let mut data = base
            .get::<_, &NbtCompound>("Data")
            .map(Clone::clone)
            .unwrap_or_else(|_| NbtCompound::new());
        data.insert("Time", NbtTag::Long(self.time));
        data.insert("SpawnX", NbtTag::Int(self.spawn.x));
        data.insert("SpawnY", NbtTag::Int(self.spawn.y));
        data.insert("SpawnZ", NbtTag::Int(self.spawn.z));
        data.insert("RandomSeed", NbtTag::Long(self.seed));
        base.insert("Data", NbtTag::Compound(data));

        let trees: Vec<NbtTag> = self
            .saplings
            .iter()
            .map(|s| {
                let mut tree = NbtCompound::new();
                tree.insert("X", NbtTag::Int(s.pos.x));
                tree.insert("Y", NbtTag::Int(s.pos.y));
                tree.insert("Z", NbtTag::Int(s.pos.z));
                tree.insert("plantedTime", NbtTag::Int(s.planted_at));
                tree.insert("plantedBy", NbtTag::Int(s.planted_by));
                NbtTag::Compound(tree)
            })
            .collect();
        base.insert("Trees", NbtTag::List(NbtList::from(trees)));
        base
    }

    pub fn to_nbt(&self) -> NbtCompound {
        self.merge_into(NbtCompound::new())
    }

    /// Decodes a `level.dat` root. `Data` and its fields are required; a
    /// missing `Trees` list means no saplings, and malformed tree records are
    /// skipped.
    pub fn from_nbt(root: &NbtCompound) -> Result<Self, CodecError> {
        let data = root
            .get::<_, &NbtCompound>("Data")
            .map_err(|_| CodecError::MissingField("Data"))?;
        let long = |field: &'static str| {
            data.get::<_, i64>(field)
                .map_err(|_| CodecError::MissingField(field))
        };
        let int = |field: &'static str| {
            data.get::<_, i32>(field)
                .map_err(|_| CodecError::MissingField(field))
        };

        let mut meta = WorldMeta {
            time: long("Time")?,
            seed: long("RandomSeed")?,
            spawn: BlockPos::new(int("SpawnX")?, int("SpawnY")?, int("SpawnZ")?),
            saplings: Vec::new(),
        };

        if let Ok(trees) = root.get::<_, &NbtList>("Trees") {
            meta.saplings = trees.iter().filter_map(sapling_from_nbt).collect();
        }
        Ok(meta)
    }

    pub fn load(path: &Path) -> Result<Self, CodecError> {
        Self::from_nbt(&persist::read_nbt_file(path)?)
    }

    /// Atomically writes this metadata to `path`, merging into the current
    /// file when it is readable.
    pub fn save(&self, path: &Path) -> Result<(), CodecError> {
        let base = match persist::read_nbt_file(path) {
            Ok(root) => root,
            Err(_) => NbtCompound::new(),
        };
        persist::write_nbt_file(path, &self.merge_into(base))
    }
}

fn sapling_from_nbt(tag: &NbtTag) -> Option<SaplingRecord> {
    let NbtTag::Compound(tree) = tag else {
        return None;
    };
    Some(SaplingRecord {
        pos: BlockPos::new(
            tree.get::<_, i32>("X").ok()?,
            tree.get::<_, i32>("Y").ok()?,
            tree.get::<_, i32>("Z").ok()?,
        ),
        planted_at: tree.get::<_, i32>("plantedTime").ok()?,
        planted_by: tree.get::<_, i32>("plantedBy").ok()?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WorldMeta {
        let mut meta = WorldMeta::new(-8_123_456_789, BlockPos::new(12, 71, -40));
        meta.time = 24_000;
        meta.saplings.push(SaplingRecord {
            pos: BlockPos::new(3, 64, 9),
            planted_at: 1200,
            planted_by: 7,
        });
        meta
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("level.dat");
        let meta = sample();
        meta.save(&path).expect("save");
        assert_eq!(WorldMeta::load(&path).expect("load"), meta);
    }

    #[test]
    fn test_save_preserves_foreign_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("level.dat");

        let mut root = sample().to_nbt();
        let mut data = root.get::<_, &NbtCompound>("Data").expect("data").clone();
        data.insert("LastPlayed", NbtTag::Long(99));
        root.insert("Data", NbtTag::Compound(data));
        root.insert("Extra", NbtTag::String("kept".to_owned()));
        persist::write_nbt_file(&path, &root).expect("seed file");

        let mut meta = sample();
        meta.time = 48_000;
        meta.saplings.clear();
        meta.save(&path).expect("save");

        let back = persist::read_nbt_file(&path).expect("read");
        let data = back.get::<_, &NbtCompound>("Data").expect("data");
        assert_eq!(data.get::<_, i64>("LastPlayed").expect("kept"), 99);
        assert_eq!(data.get::<_, i64>("Time").expect("time"), 48_000);
        assert_eq!(back.get::<_, &str>("Extra").expect("extra"), "kept");
        assert_eq!(WorldMeta::from_nbt(&back).expect("decode").saplings.len(), 0);
    }

    #[test]
    fn test_missing_data_is_an_error() {
        let err = WorldMeta::from_nbt(&NbtCompound::new()).expect_err("no data");
        assert!(matches!(err, CodecError::MissingField("Data")));
    }

    #[test]
    fn test_malformed_trees_are_skipped() {
        let mut root = sample().to_nbt();
        let mut bad = NbtCompound::new();
        bad.insert("X", NbtTag::Int(1));
        let trees = root.get::<_, &NbtList>("Trees").expect("trees").clone();
        let mut entries: Vec<NbtTag> = trees.iter().cloned().collect();
        entries.push(NbtTag::Compound(bad));
        root.insert("Trees", NbtTag::List(NbtList::from(entries)));

        let meta = WorldMeta::from_nbt(&root).expect("decode");
        assert_eq!(meta.saplings, sample().saplings);
    }
}
