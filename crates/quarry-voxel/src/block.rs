//! Voxel type codes used by the storage and lighting core.
//!
//! A voxel type is a single byte. Only the codes the engine itself needs to
//! reason about are named here; the rest of the 0..=255 range is opaque data.

/// Voxel type code.
pub type BlockId = u8;

pub const AIR: BlockId = 0x00;
pub const STONE: BlockId = 0x01;
pub const GRASS: BlockId = 0x02;
pub const DIRT: BlockId = 0x03;
pub const SAPLING: BlockId = 0x06;
pub const BEDROCK: BlockId = 0x07;
pub const WATER: BlockId = 0x08;
pub const STATIONARY_WATER: BlockId = 0x09;
pub const LAVA: BlockId = 0x0A;
pub const STATIONARY_LAVA: BlockId = 0x0B;
pub const LOG: BlockId = 0x11;
pub const LEAVES: BlockId = 0x12;
pub const GLASS: BlockId = 0x14;
pub const TORCH: BlockId = 0x32;
pub const FIRE: BlockId = 0x33;
pub const CHEST: BlockId = 0x36;
pub const FURNACE: BlockId = 0x3D;
pub const LIT_FURNACE: BlockId = 0x3E;
pub const SIGN_POST: BlockId = 0x3F;
pub const WALL_SIGN: BlockId = 0x44;
pub const ICE: BlockId = 0x4F;
pub const GLOWSTONE: BlockId = 0x59;
