//! Block store - the storage collaborator consumed by the index.
//!
//! The B+ tree never keeps a block borrowed across calls. It reads a block
//! into a transient node, mutates the node, and writes it back through
//! [`BlockStore::write_block`]. Block ids are handed out by the index
//! descriptor, so a store only has to materialize whatever id it is given.

use std::collections::HashMap;

use crate::common::{BlockId, Error, Result};
use crate::storage::block::Block;

/// Fixed-size block storage for one index.
pub trait BlockStore {
    /// Read a copy of a block.
    ///
    /// # Errors
    /// Returns `Error::BlockNotFound` if the block was never written.
    fn read_block(&mut self, block_id: BlockId) -> Result<Block>;

    /// Persist a block, creating it if needed.
    fn write_block(&mut self, block_id: BlockId, block: &Block) -> Result<()>;

    /// Release a block that no node references anymore.
    ///
    /// Block ids are never reused, so the default implementation does
    /// nothing.
    fn discard_block(&mut self, _block_id: BlockId) -> Result<()> {
        Ok(())
    }
}

impl<S: BlockStore + ?Sized> BlockStore for &mut S {
    fn read_block(&mut self, block_id: BlockId) -> Result<Block> {
        (**self).read_block(block_id)
    }

    fn write_block(&mut self, block_id: BlockId, block: &Block) -> Result<()> {
        (**self).write_block(block_id, block)
    }

    fn discard_block(&mut self, block_id: BlockId) -> Result<()> {
        (**self).discard_block(block_id)
    }
}

/// In-memory block store.
///
/// Discarded blocks are dropped, so a dangling reference to a merged-away
/// node surfaces as `Error::BlockNotFound` instead of stale data.
#[derive(Default)]
pub struct MemoryBlockStore {
    blocks: HashMap<BlockId, Box<Block>>,
}

impl MemoryBlockStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Check whether a block is present.
    pub fn contains(&self, block_id: BlockId) -> bool {
        self.blocks.contains_key(&block_id)
    }
}

impl BlockStore for MemoryBlockStore {
    fn read_block(&mut self, block_id: BlockId) -> Result<Block> {
        let stored = self
            .blocks
            .get(&block_id)
            .ok_or(Error::BlockNotFound(block_id.0))?;

        let mut block = Block::new();
        block.copy_from(stored);
        Ok(block)
    }

    fn write_block(&mut self, block_id: BlockId, block: &Block) -> Result<()> {
        self.blocks
            .entry(block_id)
            .or_insert_with(|| Box::new(Block::new()))
            .copy_from(block);
        Ok(())
    }

    fn discard_block(&mut self, block_id: BlockId) -> Result<()> {
        self.blocks.remove(&block_id);
        Ok(())
    }
}
