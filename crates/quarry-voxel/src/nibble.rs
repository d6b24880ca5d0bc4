//! Nibble-packed arrays: two 4-bit values per byte.
//!
//! Used for block metadata and both light planes. The value for an even
//! voxel index lives in the low nibble of byte `index >> 1`, an odd index
//! in the high nibble. Because [`LocalPos::index`](crate::LocalPos::index)
//! has the parity of `y`, this is the same as "even y low, odd y high".

use crate::coords::CHUNK_VOLUME;

/// Length in bytes of a chunk-sized nibble array.
pub const NIBBLE_LEN: usize = CHUNK_VOLUME / 2;

/// A fixed-size array of [`CHUNK_VOLUME`] 4-bit values.
#[derive(Clone, PartialEq, Eq)]
pub struct NibbleArray {
    data: Box<[u8]>,
}

impl NibbleArray {
    /// Creates an array with every value set to zero.
    pub fn new() -> Self {
        Self::filled(0)
    }

    /// Creates an array with every value set to `value & 0xF`.
    pub fn filled(value: u8) -> Self {
        let v = value & 0x0F;
        Self {
            data: vec![v | (v << 4); NIBBLE_LEN].into_boxed_slice(),
        }
    }

    /// Wraps raw packed bytes. Returns `None` unless exactly [`NIBBLE_LEN`] bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        (bytes.len() == NIBBLE_LEN).then(|| Self {
            data: bytes.into_boxed_slice(),
        })
    }

    /// Returns the packed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the value at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= CHUNK_VOLUME`.
    #[inline]
    pub fn get(&self, index: usize) -> u8 {
        let byte = self.data[index >> 1];
        if index & 1 == 0 { byte & 0x0F } else { byte >> 4 }
    }

    /// Sets the value at `index` to `value & 0xF`, leaving the sibling nibble intact.
    ///
    /// # Panics
    ///
    /// Panics if `index >= CHUNK_VOLUME`.
    #[inline]
    pub fn set(&mut self, index: usize, value: u8) {
        let v = value & 0x0F;
        let byte = &mut self.data[index >> 1];
        if index & 1 == 0 {
            *byte = (*byte & 0xF0) | v;
        } else {
            *byte = (*byte & 0x0F) | (v << 4);
        }
    }

    /// Resets every value to zero.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

impl Default for NibbleArray {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NibbleArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nonzero = self.data.iter().filter(|b| **b != 0).count();
        f.debug_struct("NibbleArray")
            .field("len", &CHUNK_VOLUME)
            .field("nonzero_bytes", &nonzero)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
