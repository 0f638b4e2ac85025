//! Storage layer - block I/O consumed by the index.
//!
//! This module provides the storage collaborator of the B+ tree:
//! - [`Block`] - The raw 4KB data container with typed field accessors
//! - [`BlockStore`] - The read/write/discard contract the tree relies on
//! - [`MemoryBlockStore`] - Volatile store, used by tests and benchmarks
//! - [`FileBlockStore`] - One file per index, fsync on every write

mod block;
mod file_store;
mod store;

pub use block::Block;
pub use file_store::FileBlockStore;
pub use store::{BlockStore, MemoryBlockStore};
