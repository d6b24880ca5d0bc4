//! Per-voxel-type lighting constants.
//!
//! Two 256-entry tables indexed by [`BlockId`]: how much light a type emits
//! and how much it subtracts from light passing through it. Tables are plain
//! values so tests can build custom ones with the `with_*` builders.

use crate::block::{self, BlockId};

/// Maximum light level for either plane.
pub const MAX_LIGHT: u8 = 15;

/// Opacity of a type that fully blocks light.
pub const OPAQUE: u8 = 16;

/// Emission and opacity lookup tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LightTables {
    emission: [u8; 256],
    opacity: [u8; 256],
}

impl LightTables {
    /// Tables with no emitters and every type opaque except air.
    pub fn empty() -> Self {
        let mut opacity = [OPAQUE; 256];
        opacity[usize::from(block::AIR)] = 0;
        Self {
            emission: [0; 256],
            opacity,
        }
    }

    /// The classic block set's lighting values.
    pub fn classic() -> Self {
        let mut tables = Self::empty();

        for (id, level) in [
            (block::LAVA, 15),
            (block::STATIONARY_LAVA, 15),
            (0x27, 1), // brown mushroom
            (block::TORCH, 14),
            (block::FIRE, 15),
            (block::LIT_FURNACE, 14),
            (0x4A, 9), // lit redstone ore
            (0x4C, 7), // redstone torch (on)
            (block::GLOWSTONE, 15),
            (0x5A, 11), // portal
            (0x5B, 15), // jack-o-lantern
        ] {
            tables.emission[usize::from(id)] = level;
        }

        // Transparent: plants, glass, torches, fire, rails, signs, doors...
        for id in [
            block::AIR,
            block::SAPLING,
            block::GLASS,
            0x25,
            0x26,
            0x27,
            0x28,
            block::TORCH,
            block::FIRE,
            0x34,
            0x35,
            0x37,
            block::SIGN_POST,
            0x40,
            0x41,
            0x42,
            0x43,
            block::WALL_SIGN,
            0x47,
            0x4B,
            0x4C,
            0x4E,
            0x55,
            0x5A,
            0x5B,
        ] {
            tables.opacity[usize::from(id)] = 0;
        }

        for id in [
            block::WATER,
            block::STATIONARY_WATER,
            block::LEAVES,
            block::ICE,
        ] {
            tables.opacity[usize::from(id)] = 3;
        }

        tables
    }

    /// Light level emitted by `id` (0..=15).
    #[inline]
    pub fn emission(&self, id: BlockId) -> u8 {
        self.emission[usize::from(id)]
    }

    /// Light subtracted when passing through `id`, on top of the 1-per-step decay.
    #[inline]
    pub fn opacity(&self, id: BlockId) -> u8 {
        self.opacity[usize::from(id)]
    }

    /// Returns a copy with `id`'s emission overridden.
    pub fn with_emission(mut self, id: BlockId, level: u8) -> Self {
        self.emission[usize::from(id)] = level.min(MAX_LIGHT);
        self
    }

    /// Returns a copy with `id`'s opacity overridden.
    pub fn with_opacity(mut self, id: BlockId, opacity: u8) -> Self {
        self.opacity[usize::from(id)] = opacity;
        self
    }
}

impl Default for LightTables {
    fn default() -> Self {
        Self::classic()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
