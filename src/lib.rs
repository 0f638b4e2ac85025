//! blockindex - the indexing core of a disk-backed database engine.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          blockindex                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │        Catalog / SQL binding  (external callers)         │   │
//! │  │   own the IndexDescriptor, serialize access per index    │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Index Layer (index/btree/)                  │   │
//! │  │   BPlusTree: insert/split, delete/borrow/merge, search   │   │
//! │  │   Node + NodeLayout: one node per block, leaf chain      │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Storage Layer (storage/)                    │   │
//! │  │   BlockStore trait: MemoryBlockStore | FileBlockStore    │   │
//! │  │   Block: 4KB little-endian field accessors               │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (BlockId, Error, config)
//! - [`storage`] - Blocks and block stores
//! - [`index`] - The B+ tree
//!
//! # Quick Start
//! ```no_run
//! use blockindex::index::btree::{BPlusTree, IndexDescriptor, Key, KeyType};
//! use blockindex::storage::FileBlockStore;
//!
//! let store = FileBlockStore::open_or_create("users_name.idx").unwrap();
//! let descriptor = IndexDescriptor::new("users_name", KeyType::Char, 16).unwrap();
//! let mut tree = BPlusTree::new(descriptor, store).unwrap();
//!
//! tree.insert(&Key::text("ada", 16).unwrap(), 4, 256).unwrap();
//!
//! // Persist the descriptor next to the catalog entry.
//! let (descriptor, _store) = tree.into_parts();
//! let bytes = descriptor.to_bytes();
//! ```

pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::BLOCK_SIZE;
pub use common::{BlockId, Error, Result};

pub use index::btree::{BPlusTree, Comparison, IndexDescriptor, Key, KeyType, RowLocator};
pub use storage::{Block, BlockStore, FileBlockStore, MemoryBlockStore};
