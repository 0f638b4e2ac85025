//! Block - the fixed-size unit of index storage.
//!
//! A [`Block`] is a raw 4KB byte array. B+ tree nodes are encoded directly
//! into blocks starting at byte 0; see [`crate::index::btree::Node`] for the
//! layout. All integer fields are little-endian.

use crate::common::config::BLOCK_SIZE;

/// A block of data (4KB, 4KB-aligned).
///
/// # Clone Implementation
/// `Block` does NOT implement `Clone` in production code (copying 4KB should
/// be explicit, see [`Block::copy_from`]). A `#[cfg(test)]` Clone is provided
/// for tests.
///
/// # Example
/// ```
/// use blockindex::storage::Block;
///
/// let mut block = Block::new();
/// block.write_u32(8, u32::MAX);
/// assert_eq!(block.read_u32(8), u32::MAX);
/// assert_eq!(block.as_slice()[8], 0xFF);
/// ```
#[repr(align(4096))]
pub struct Block {
    data: [u8; BLOCK_SIZE],
}

impl Block {
    /// Create a new zeroed block.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; BLOCK_SIZE],
        }
    }

    /// Get immutable slice of block data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of block data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Overwrite this block with the contents of another.
    #[inline]
    pub fn copy_from(&mut self, other: &Block) {
        self.data.copy_from_slice(&other.data);
    }

    /// Zero out the entire block.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Get the size of a block.
    #[inline]
    pub const fn size() -> usize {
        BLOCK_SIZE
    }

    /// Read a little-endian `u32` at `offset`.
    ///
    /// # Panics
    /// Panics if `offset + 4 > BLOCK_SIZE`.
    #[inline]
    pub fn read_u32(&self, offset: usize) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[offset..offset + 4]);
        u32::from_le_bytes(bytes)
    }

    /// Write a little-endian `u32` at `offset`.
    ///
    /// # Panics
    /// Panics if `offset + 4 > BLOCK_SIZE`.
    #[inline]
    pub fn write_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Borrow `len` raw bytes starting at `offset`.
    ///
    /// # Panics
    /// Panics if the range exceeds the block.
    #[inline]
    pub fn read_bytes(&self, offset: usize, len: usize) -> &[u8] {
        &self.data[offset..offset + len]
    }

    /// Copy `bytes` into the block at `offset`.
    ///
    /// # Panics
    /// Panics if the range exceeds the block.
    #[inline]
    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Move `len` bytes from `src` to `dst` within the block (ranges may overlap).
    ///
    /// # Panics
    /// Panics if either range exceeds the block.
    #[inline]
    pub fn copy_within(&mut self, src: usize, dst: usize, len: usize) {
        self.data.copy_within(src..src + len, dst);
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for Block {
    fn clone(&self) -> Self {
        let mut new_block = Block::new();
        new_block.data.copy_from_slice(&self.data);
        new_block
    }
}

// ============================================================================
// TESTS
// ============================================================================
