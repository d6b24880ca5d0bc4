//! Chunk storage for a 16×128×16-column voxel world: the chunk data unit,
//! nibble-packed planes, lighting constants, tile entities, and the NBT
//! chunk and world-metadata file formats.

pub mod block;
pub mod chunk;
pub mod chunk_serial;
pub mod coords;
pub mod error;
pub mod level;
pub mod light_tables;
pub mod nibble;
pub mod persist;
pub mod region;
pub mod tile_entity;

pub use block::BlockId;
pub use chunk::{Chunk, HEIGHTMAP_LEN, LIGHT_DIRTY, LightPlanes, SAVE_DIRTY};
pub use chunk_serial::{PAYLOAD_LEN, deflate};
pub use coords::{BlockPos, CHUNK_HEIGHT, CHUNK_VOLUME, CHUNK_WIDTH, ChunkPos, LocalPos, MAX_Y};
pub use error::CodecError;
pub use level::{SaplingRecord, WorldMeta};
pub use light_tables::{LightTables, MAX_LIGHT};
pub use nibble::{NIBBLE_LEN, NibbleArray};
pub use region::{chunk_path, level_path};
pub use tile_entity::{
    CHEST_SLOTS, Chest, FURNACE_SLOTS, Furnace, ItemSlot, Lock, Sign, TileEntity,
};
