//! File block store - persistent storage for one index file.
//!
//! The [`FileBlockStore`] handles all direct file operations:
//! - Reading and writing blocks
//! - Growing the file when a new block id is first written
//! - Managing the index file

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::config::BLOCK_SIZE;
use crate::common::{BlockId, Error, Result};
use crate::storage::block::Block;
use crate::storage::store::BlockStore;

/// Stores the blocks of a single index in one file.
///
/// # File Layout
/// ```text
/// ┌──────────┬──────────┬──────────┬─────────┬──────────┐
/// │ Block 0  │ Block 1  │ Block 2  │  ...    │ Block N  │
/// │ (4KB)    │ (4KB)    │ (4KB)    │         │ (4KB)    │
/// └──────────┴──────────┴──────────┴─────────┴──────────┘
/// Offset:  0      4096      8192     ...     N×4096
/// ```
///
/// Block N is located at file offset `N × BLOCK_SIZE`. Writing block N past
/// the current end zero-fills the gap.
///
/// # Thread Safety
/// `FileBlockStore` is **single-threaded**; callers serialize access to the
/// index that owns it.
///
/// # Durability
/// All writes are followed by `fsync()`.
pub struct FileBlockStore {
    file: File,
    /// Number of blocks in the file.
    block_count: u32,
}

impl FileBlockStore {
    /// Create a new index file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            block_count: 0,
        })
    }

    /// Open an existing index file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        // Calculate block count from file size
        let metadata = file.metadata()?;
        let block_count = (metadata.len() / BLOCK_SIZE as u64) as u32;

        Ok(Self { file, block_count })
    }

    /// Open an existing index file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Get the number of blocks in the file.
    #[inline]
    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    /// Get the total size of the index file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        (self.block_count as u64) * (BLOCK_SIZE as u64)
    }

    fn offset_of(block_id: BlockId) -> u64 {
        (block_id.0 as u64) * (BLOCK_SIZE as u64)
    }

    /// Zero-fill blocks `[block_count, upto)`.
    fn extend_to(&mut self, upto: u32) -> Result<()> {
        if upto <= self.block_count {
            return Ok(());
        }

        self.file
            .seek(SeekFrom::Start(Self::offset_of(BlockId::new(self.block_count))))?;

        let zeros = [0u8; BLOCK_SIZE];
        for _ in self.block_count..upto {
            self.file.write_all(&zeros)?;
        }
        self.block_count = upto;
        Ok(())
    }
}

impl BlockStore for FileBlockStore {
    fn read_block(&mut self, block_id: BlockId) -> Result<Block> {
        if !block_id.is_valid() || block_id.0 >= self.block_count {
            return Err(Error::BlockNotFound(block_id.0));
        }

        self.file.seek(SeekFrom::Start(Self::offset_of(block_id)))?;

        let mut block = Block::new();
        self.file.read_exact(block.as_mut_slice())?;

        Ok(block)
    }

    fn write_block(&mut self, block_id: BlockId, block: &Block) -> Result<()> {
        if !block_id.is_valid() {
            return Err(Error::BlockNotFound(block_id.0));
        }

        self.extend_to(block_id.0)?;

        self.file.seek(SeekFrom::Start(Self::offset_of(block_id)))?;
        self.file.write_all(block.as_slice())?;
        self.file.sync_all()?; // fsync for durability

        if block_id.0 >= self.block_count {
            self.block_count = block_id.0 + 1;
        }
        Ok(())
    }
}
