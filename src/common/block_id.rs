//! Block identifier type.

use std::fmt;

/// Identifies a block of an index file.
///
/// Blocks are numbered from 0 in allocation order. On disk a block id is a
/// 4-byte little-endian integer; [`BlockId::INVALID`] is stored as `-1` and
/// means "no parent", "no child" or "no next leaf".
///
/// # Example
/// ```
/// use blockindex::BlockId;
///
/// let block_id = BlockId::new(42);
/// assert!(block_id.is_valid());
/// assert_eq!(block_id.0, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    /// Invalid/sentinel block ID (`-1` on disk).
    pub const INVALID: BlockId = BlockId(u32::MAX);

    /// Create a new BlockId.
    #[inline]
    pub fn new(id: u32) -> Self {
        BlockId(id)
    }

    /// Check if this block ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Decode a raw on-disk value, mapping the sentinel to `None`.
    #[inline]
    pub fn from_raw(raw: u32) -> Option<Self> {
        let id = BlockId(raw);
        id.is_valid().then_some(id)
    }

    /// Encode an optional block id, mapping `None` to the sentinel.
    #[inline]
    pub fn to_raw(id: Option<BlockId>) -> u32 {
        id.unwrap_or(Self::INVALID).0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Block(INVALID)")
        } else {
            write!(f, "Block({})", self.0)
        }
    }
}
