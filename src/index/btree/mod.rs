//! Disk-backed B+ tree index.
//!
//! Each node occupies one storage block and is addressed by its block id.
//! Leaves map keys to packed [`RowLocator`]s and are chained left to right for
//! range scans; internal nodes hold separators equal to the largest key of
//! the subtree on their left.
//!
//! # Components
//! - [`IndexDescriptor`] - Tree-wide metadata handed over by the catalog
//! - [`NodeLayout`] - Byte offsets of node fields, derived from key length and rank
//! - [`Node`] - Decoded view of one block with local search and mutation
//! - [`BPlusTree`] - Insert, delete, point and range queries over a [`BlockStore`](crate::storage::BlockStore)
//! - [`Key`] / [`KeyType`] - Fixed-length int, float and char keys
//!
//! # Example
//! ```
//! use blockindex::index::btree::{BPlusTree, Comparison, IndexDescriptor, Key, KeyType};
//! use blockindex::storage::MemoryBlockStore;
//!
//! let descriptor = IndexDescriptor::new("orders_id", KeyType::Int, 4)?;
//! let mut tree = BPlusTree::new(descriptor, MemoryBlockStore::new())?;
//!
//! for id in 0..100 {
//!     tree.insert(&Key::int(id), 1 + id as u32 / 32, (id as u32 % 32) * 128)?;
//! }
//! tree.delete(&Key::int(50))?;
//!
//! assert_eq!(tree.range_query(&Key::int(90), Comparison::Ge)?.len(), 10);
//! assert!(tree.point_query(&Key::int(50))?.is_none());
//! # Ok::<(), blockindex::Error>(())
//! ```

mod descriptor;
mod key;
mod layout;
mod locator;
mod node;
mod range;
mod tree;
mod validate;

pub use descriptor::IndexDescriptor;
pub use key::{Key, KeyType};
pub use layout::NodeLayout;
pub use locator::RowLocator;
pub use node::{Node, NodeType};
pub use range::Comparison;
pub use tree::{BPlusTree, Lookup};
pub use validate::TreeShape;
