//! Node layout - offsets of every field inside a node block.
//!
//! # Layout
//! ```text
//! Offset                 Size       Field
//! ------                 ----       -----
//! 0                      4          node type (1 = leaf, 0 = internal)
//! 4                      4          count (populated key slots)
//! 8                      4          parent block id (-1 = root)
//! 12 + i*stride          4          value[i]: row locator (leaf) or child id
//! 12 + i*stride + 4      key_len    key[i]
//! 12 + degree*stride     4          next leaf (leaf only, -1 = end of chain)
//! ```
//!
//! `stride = 4 + key_len`. An internal node uses value slots `0..=count`; the
//! key bytes of slot `count` are unused. A leaf uses slots `0..count` and the
//! value field of slot `degree` for its chain pointer.

use crate::common::config::{max_rank, BLOCK_SIZE, NODE_HEADER_SIZE, VALUE_SIZE};
use crate::common::{Error, Result};
use crate::index::btree::key::{Key, KeyType};

/// Fixed geometry shared by every node of one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayout {
    key_type: KeyType,
    key_len: usize,
    rank: usize,
    degree: usize,
    stride: usize,
}

impl NodeLayout {
    /// Derive the layout for `rank`, checking a node fits one block.
    ///
    /// # Errors
    /// Returns `Error::InvalidLayout` if `rank` is 0, `key_len` is 0, a
    /// numeric key is not 4 bytes, or `degree + 1` slots overflow the block.
    pub fn new(key_type: KeyType, key_len: usize, rank: usize) -> Result<Self> {
        if key_len == 0 {
            return Err(Error::InvalidLayout("key length must be positive".into()));
        }
        if let Some(fixed) = key_type.fixed_len() {
            if key_len != fixed {
                return Err(Error::InvalidLayout(format!(
                    "{} keys are {} bytes, not {}",
                    key_type.name(),
                    fixed,
                    key_len
                )));
            }
        }
        if rank == 0 {
            return Err(Error::InvalidLayout("rank must be at least 1".into()));
        }
        if rank > max_rank(key_len) {
            return Err(Error::InvalidLayout(format!(
                "rank {} with {}-byte keys does not fit a {}-byte block (max rank {})",
                rank,
                key_len,
                BLOCK_SIZE,
                max_rank(key_len)
            )));
        }

        Ok(Self {
            key_type,
            key_len,
            rank,
            degree: 2 * rank + 1,
            stride: VALUE_SIZE + key_len,
        })
    }

    #[inline]
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    #[inline]
    pub fn key_len(&self) -> usize {
        self.key_len
    }

    /// Minimum number of keys in a non-root node.
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Key count at which a node must split (`2 * rank + 1`).
    #[inline]
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Bytes per slot: packed value followed by the key.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn value_offset(&self, slot: usize) -> usize {
        NODE_HEADER_SIZE + slot * self.stride
    }

    #[inline]
    pub fn key_offset(&self, slot: usize) -> usize {
        self.value_offset(slot) + VALUE_SIZE
    }

    /// Offset of the leaf chain pointer (value field of slot `degree`).
    #[inline]
    pub fn next_leaf_offset(&self) -> usize {
        self.value_offset(self.degree)
    }

    /// Bytes of the block a node actually uses.
    #[inline]
    pub fn node_size(&self) -> usize {
        NODE_HEADER_SIZE + (self.degree + 1) * self.stride
    }

    /// Check a caller-supplied key matches this index's encoding.
    ///
    /// # Errors
    /// Returns `Error::KeyMismatch` on a type or length mismatch.
    pub fn check_key(&self, key: &Key) -> Result<()> {
        if key.key_type() != self.key_type || key.len() != self.key_len {
            return Err(Error::KeyMismatch {
                expected: self.key_type.name(),
                expected_len: self.key_len,
                found: key.key_type().name(),
                found_len: key.len(),
            });
        }
        Ok(())
    }
}
