//! Configuration constants for the index.

/// Size of an index block in bytes (4KB).
///
/// Every B+ tree node occupies exactly one block. The block size is fixed for
/// the lifetime of an index and, together with the key length, bounds the
/// node degree.
pub const BLOCK_SIZE: usize = 4096;

/// Byte offset of the node type field (1 = leaf, 0 = internal).
pub const OFFSET_NODE_TYPE: usize = 0;

/// Byte offset of the populated slot count.
pub const OFFSET_COUNT: usize = 4;

/// Byte offset of the parent block id.
pub const OFFSET_PARENT: usize = 8;

/// Size of the node header. Slots start right after it.
pub const NODE_HEADER_SIZE: usize = 12;

/// Size of the packed value / child id stored in front of every key.
pub const VALUE_SIZE: usize = 4;

/// Nodes holding at most this many keys are searched linearly.
pub const LINEAR_SEARCH_LIMIT: usize = 20;

/// Largest in-block offset a row locator can carry (low 16 bits).
pub const MAX_ROW_OFFSET: u32 = 0xFFFF;

/// Largest block number a row locator can carry (high 16 bits).
pub const MAX_ROW_BLOCK: u32 = 0xFFFF;

/// Largest rank whose node layout still fits in one block.
///
/// A node needs `degree + 1` slots of `VALUE_SIZE + key_len` bytes: `degree`
/// keys while it waits to be split, plus the trailing child id (internal) or
/// next-leaf pointer (leaf).
pub const fn max_rank(key_len: usize) -> usize {
    let slots = (BLOCK_SIZE - NODE_HEADER_SIZE) / (VALUE_SIZE + key_len);
    if slots < 4 {
        0
    } else {
        (slots - 2) / 2
    }
}
