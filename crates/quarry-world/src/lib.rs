//! The world: chunk residency, voxel and light access by world coordinate,
//! saplings and dropped items, and outbound chunk messages.

mod access;
pub mod error;
pub mod events;
pub mod generator;
pub mod overlay;
pub mod store;
pub mod world;

pub use error::WorldError;
pub use events::{ChannelSink, ClientId, EventSink, NullSink, Recipient, WorldEvent};
pub use generator::{BlockPlacement, FlatGenerator, TerrainGenerator};
pub use overlay::{EntityOverlay, FixedPos, SpawnedItem};
pub use store::{ChunkHandle, ChunkStore, Loaded};
pub use world::World;
