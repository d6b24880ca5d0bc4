//! Chunk file codec and the network chunk payload.
//!
//! A chunk file is gzip-compressed NBT whose root holds a `Level` compound:
//!
//! | Field | Tag | Size |
//! |-------|-----|------|
//! | `xPos`, `zPos` | Int | must equal the requested chunk |
//! | `Blocks` | ByteArray | 32 768 |
//! | `Data` | ByteArray | 16 384 (metadata nibbles) |
//! | `BlockLight` | ByteArray | 16 384 |
//! | `SkyLight` | ByteArray | 16 384 |
//! | `HeightMap` | ByteArray | 256 |
//! | `TileEntities` | List of Compound | see [`TileEntity`] |
//!
//! Decoding is all-or-nothing for the fixed fields: any length or position
//! mismatch fails the whole chunk. Individual tile entities that fail to
//! decode are dropped with a log line.

use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use quartz_nbt::{NbtCompound, NbtList, NbtTag};

use crate::chunk::{Chunk, HEIGHTMAP_LEN};
use crate::coords::{CHUNK_VOLUME, ChunkPos};
use crate::error::CodecError;
use crate::nibble::{NIBBLE_LEN, NibbleArray};
use crate::persist;
use crate::tile_entity::TileEntity;

/// Size of the uncompressed network payload: blocks, metadata, block light, sky light.
pub const PAYLOAD_LEN: usize = CHUNK_VOLUME + 3 * NIBBLE_LEN;

impl Chunk {
    /// Encodes this chunk as a chunk-file root compound.
    pub fn to_nbt(&self) -> NbtCompound {
        let mut level = NbtCompound::new();
        level.insert("xPos", NbtTag::Int(self.pos().x));
        level.insert("zPos", NbtTag::Int(self.pos().z));
        level.insert("Blocks", byte_tag(self.blocks()));
        level.insert("Data", byte_tag(self.metadata_plane().as_bytes()));
        level.insert("BlockLight", byte_tag(self.blocklight_plane().as_bytes()));
        level.insert("SkyLight", byte_tag(self.skylight_plane().as_bytes()));
        level.insert("HeightMap", byte_tag(self.heightmap()));

        let entities: Vec<NbtTag> = self
            .tile_entities()
            .map(|e| NbtTag::Compound(e.to_nbt()))
            .collect();
        level.insert("TileEntities", NbtTag::List(NbtList::from(entities)));

        let mut root = NbtCompound::new();
        root.insert("Level", NbtTag::Compound(level));
        root
    }

    /// Decodes a chunk-file root compound, which must describe `expected`.
    pub fn from_nbt(root: &NbtCompound, expected: ChunkPos) -> Result<Chunk, CodecError> {
        let level = root
            .get::<_, &NbtCompound>("Level")
            .map_err(|_| CodecError::MissingField("Level"))?;

        let found = ChunkPos::new(
            level
                .get::<_, i32>("xPos")
                .map_err(|_| CodecError::MissingField("xPos"))?,
            level
                .get::<_, i32>("zPos")
                .map_err(|_| CodecError::MissingField("zPos"))?,
        );
        if found != expected {
            return Err(CodecError::PositionMismatch { expected, found });
        }

        let blocks = byte_array(level, "Blocks", CHUNK_VOLUME)?;
        let metadata = nibble_array(level, "Data")?;
        let blocklight = nibble_array(level, "BlockLight")?;
        let skylight = nibble_array(level, "SkyLight")?;
        let mut heightmap = [0u8; HEIGHTMAP_LEN];
        heightmap.copy_from_slice(&byte_array(level, "HeightMap", HEIGHTMAP_LEN)?);

        let mut chunk = Chunk::from_planes(
            expected,
            blocks.into_boxed_slice(),
            metadata,
            skylight,
            blocklight,
            heightmap,
        );

        if let Ok(entities) = level.get::<_, &NbtList>("TileEntities") {
            for tag in entities.iter() {
                let NbtTag::Compound(compound) = tag else {
                    tracing::debug!("skipping non-compound tile entity in chunk {:?}", expected);
                    continue;
                };
                match TileEntity::from_nbt(compound) {
                    Some(entity) => {
                        chunk.insert_tile_entity(entity);
                    }
                    None => {
                        tracing::debug!("skipping malformed tile entity in chunk {:?}", expected)
                    }
                }
            }
        }

        chunk.clear_dirty(u8::MAX);
        Ok(chunk)
    }

    /// Reads and decodes the chunk file at `path`.
    pub fn load(path: &Path, expected: ChunkPos) -> Result<Chunk, CodecError> {
        let root = persist::read_nbt_file(path)?;
        Self::from_nbt(&root, expected)
    }

    /// Encodes and atomically writes this chunk to `path`.
    pub fn save(&self, path: &Path) -> Result<(), CodecError> {
        persist::write_nbt_file(path, &self.to_nbt())
    }

    /// Raw network payload: blocks, then metadata, block light, and sky light.
    pub fn network_payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PAYLOAD_LEN);
        out.extend_from_slice(self.blocks());
        out.extend_from_slice(self.metadata_plane().as_bytes());
        out.extend_from_slice(self.blocklight_plane().as_bytes());
        out.extend_from_slice(self.skylight_plane().as_bytes());
        out
    }

    /// Zlib-deflated [`network_payload`](Self::network_payload).
    pub fn compressed_payload(&self) -> std::io::Result<Vec<u8>> {
        deflate(&self.network_payload())
    }
}

/// Zlib-compresses `raw` at the default level.
pub fn deflate(raw: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    encoder.finish()
}

fn byte_tag(bytes: &[u8]) -> NbtTag {
    NbtTag::ByteArray(bytes.iter().map(|b| *b as i8).collect())
}

fn byte_array(
    level: &NbtCompound,
    field: &'static str,
    expected: usize,
) -> Result<Vec<u8>, CodecError> {
    let bytes = level
        .get::<_, &[i8]>(field)
        .map_err(|_| CodecError::MissingField(field))?;
    if bytes.len() != expected {
        return Err(CodecError::WrongLength {
            field,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(bytes.iter().map(|b| *b as u8).collect())
}

fn nibble_array(level: &NbtCompound, field: &'static str) -> Result<NibbleArray, CodecError> {
    let bytes = byte_array(level, field, NIBBLE_LEN)?;
    NibbleArray::from_bytes(bytes).ok_or(CodecError::WrongLength {
        field,
        expected: NIBBLE_LEN,
        actual: 0,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
