//! B+ tree node - a decoded view of one index block.
//!
//! A [`Node`] owns a copy of its block. The tree loads a node by id, mutates
//! it through the accessors below and writes the block back; nodes are never
//! cached across operations. See [`layout`](super::layout) for the byte
//! layout.
//!
//! Node operations only ever touch their own block. Anything that needs a
//! second node (reparenting children, wiring a split into the parent) is done
//! by the tree.

use std::cmp::Ordering;
use std::fmt;

use crate::common::config::{LINEAR_SEARCH_LIMIT, OFFSET_COUNT, OFFSET_NODE_TYPE, OFFSET_PARENT};
use crate::common::{BlockId, Error, Result};
use crate::index::btree::key::Key;
use crate::index::btree::layout::NodeLayout;
use crate::index::btree::locator::RowLocator;
use crate::storage::Block;

/// Node type discriminant, stored as a 4-byte integer at offset 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum NodeType {
    Internal = 0,
    Leaf = 1,
}

/// One B+ tree node.
///
/// - Leaf: `count` (key, row locator) pairs plus the next-leaf pointer.
/// - Internal: `count` keys and `count + 1` children. `child(i)` holds keys
///   `<= key(i)`, `child(count)` holds keys `> key(count - 1)`; every
///   separator equals the largest key of the subtree on its left.
pub struct Node {
    id: BlockId,
    layout: NodeLayout,
    block: Box<Block>,
}

impl Node {
    /// Format a fresh, empty node with no parent.
    pub fn create(id: BlockId, layout: NodeLayout, node_type: NodeType) -> Self {
        let mut node = Self {
            id,
            layout,
            block: Box::new(Block::new()),
        };
        node.block.write_u32(OFFSET_NODE_TYPE, node_type as u32);
        node.set_count(0);
        node.set_parent(None);
        if node_type == NodeType::Leaf {
            node.set_next_leaf(None);
        }
        node
    }

    /// Decode a block read from storage.
    ///
    /// # Errors
    /// Returns `Error::StructuralViolation` if the node type is unknown or
    /// the count exceeds the degree.
    pub fn open(id: BlockId, layout: NodeLayout, block: Block) -> Result<Self> {
        let node = Self {
            id,
            layout,
            block: Box::new(block),
        };

        let raw_type = node.block.read_u32(OFFSET_NODE_TYPE);
        if raw_type > NodeType::Leaf as u32 {
            return Err(Error::structural(format!(
                "{} has unknown node type {}",
                id, raw_type
            )));
        }
        if node.count() > layout.degree() {
            return Err(Error::structural(format!(
                "{} holds {} keys, degree is {}",
                id,
                node.count(),
                layout.degree()
            )));
        }
        Ok(node)
    }

    // ========================================================================
    // Header fields
    // ========================================================================

    #[inline]
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// The encoded block, ready to be written back.
    #[inline]
    pub fn block(&self) -> &Block {
        &self.block
    }

    #[inline]
    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    pub fn node_type(&self) -> NodeType {
        if self.block.read_u32(OFFSET_NODE_TYPE) == NodeType::Leaf as u32 {
            NodeType::Leaf
        } else {
            NodeType::Internal
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.node_type() == NodeType::Leaf
    }

    /// A node without a parent is the root.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.block.read_u32(OFFSET_COUNT) as usize
    }

    #[inline]
    pub fn set_count(&mut self, count: usize) {
        self.block.write_u32(OFFSET_COUNT, count as u32);
    }

    #[inline]
    pub fn parent(&self) -> Option<BlockId> {
        BlockId::from_raw(self.block.read_u32(OFFSET_PARENT))
    }

    #[inline]
    pub fn set_parent(&mut self, parent: Option<BlockId>) {
        self.block.write_u32(OFFSET_PARENT, BlockId::to_raw(parent));
    }

    /// Next leaf in the chain. Meaningless for internal nodes.
    #[inline]
    pub fn next_leaf(&self) -> Option<BlockId> {
        BlockId::from_raw(self.block.read_u32(self.layout.next_leaf_offset()))
    }

    #[inline]
    pub fn set_next_leaf(&mut self, next: Option<BlockId>) {
        let offset = self.layout.next_leaf_offset();
        self.block.write_u32(offset, BlockId::to_raw(next));
    }

    // ========================================================================
    // Slots
    // ========================================================================

    #[inline]
    pub fn key_bytes(&self, slot: usize) -> &[u8] {
        self.block
            .read_bytes(self.layout.key_offset(slot), self.layout.key_len())
    }

    pub fn key(&self, slot: usize) -> Key {
        Key::from_stored(self.layout.key_type(), self.key_bytes(slot))
    }

    /// All populated keys, in order.
    pub fn keys(&self) -> Vec<Key> {
        (0..self.count()).map(|i| self.key(i)).collect()
    }

    pub fn set_key(&mut self, slot: usize, key: &Key) {
        self.set_key_bytes(slot, key.as_bytes());
    }

    fn set_key_bytes(&mut self, slot: usize, bytes: &[u8]) {
        let offset = self.layout.key_offset(slot);
        self.block.write_bytes(offset, bytes);
    }

    /// Raw 32-bit value of a slot: a packed row locator or a child id.
    #[inline]
    pub fn value(&self, slot: usize) -> u32 {
        self.block.read_u32(self.layout.value_offset(slot))
    }

    #[inline]
    pub fn set_value(&mut self, slot: usize, value: u32) {
        let offset = self.layout.value_offset(slot);
        self.block.write_u32(offset, value);
    }

    /// Child block id of an internal node.
    ///
    /// # Errors
    /// Returns `Error::StructuralViolation` if the slot holds the sentinel.
    pub fn child(&self, slot: usize) -> Result<BlockId> {
        BlockId::from_raw(self.value(slot)).ok_or_else(|| {
            Error::structural(format!("{} has no child in slot {}", self.id, slot))
        })
    }

    #[inline]
    pub fn set_child(&mut self, slot: usize, child: BlockId) {
        self.set_value(slot, child.0);
    }

    /// All `count + 1` children of an internal node.
    pub fn children(&self) -> Result<Vec<BlockId>> {
        (0..=self.count()).map(|i| self.child(i)).collect()
    }

    /// Row locator stored in a leaf slot.
    #[inline]
    pub fn locator(&self, slot: usize) -> RowLocator {
        RowLocator::unpack(self.value(slot))
    }

    /// Order of `key` relative to the key in `slot`.
    #[inline]
    pub fn compare(&self, key: &Key, slot: usize) -> Ordering {
        key.cmp_raw(self.key_bytes(slot))
    }

    fn move_key(&mut self, from: usize, to: usize) {
        let len = self.layout.key_len();
        let (src, dst) = (self.layout.key_offset(from), self.layout.key_offset(to));
        self.block.copy_within(src, dst, len);
    }

    fn move_value(&mut self, from: usize, to: usize) {
        let value = self.value(from);
        self.set_value(to, value);
    }

    fn ensure_room(&self) -> Result<()> {
        if self.count() >= self.layout.degree() {
            return Err(Error::structural(format!(
                "{} is full ({} keys)",
                self.id,
                self.count()
            )));
        }
        Ok(())
    }

    fn ensure_type(&self, expected: NodeType, op: &str) -> Result<()> {
        if self.node_type() != expected {
            return Err(Error::structural(format!(
                "{} on {:?} node {}",
                op,
                self.node_type(),
                self.id
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Local search and mutation
    // ========================================================================

    /// Locate `key` among this node's keys.
    ///
    /// Returns `Ok(slot)` on an exact match, otherwise `Err(slot)` where
    /// `slot` is the first key greater than `key` (the insertion point, and
    /// the child to descend into). Small nodes are scanned linearly, larger
    /// ones binary searched.
    pub fn search(&self, key: &Key) -> std::result::Result<usize, usize> {
        let count = self.count();
        if count == 0 || self.compare(key, 0) == Ordering::Less {
            return Err(0);
        }
        if self.compare(key, count - 1) == Ordering::Greater {
            return Err(count);
        }

        if count <= LINEAR_SEARCH_LIMIT {
            for i in 0..count {
                match self.compare(key, i) {
                    Ordering::Less => return Err(i),
                    Ordering::Equal => return Ok(i),
                    Ordering::Greater => {}
                }
            }
            return Err(count);
        }

        // key(start) <= key <= key(end)
        let (mut start, mut end) = (0, count - 1);
        while end - start > 1 {
            let mid = (start + end) / 2;
            match self.compare(key, mid) {
                Ordering::Equal => return Ok(mid),
                Ordering::Less => end = mid,
                Ordering::Greater => start = mid,
            }
        }

        if self.compare(key, start) == Ordering::Equal {
            Ok(start)
        } else if self.compare(key, end) == Ordering::Equal {
            Ok(end)
        } else {
            Err(end)
        }
    }

    /// Insert a separator into an internal node.
    ///
    /// Keys from the insertion point and children after it shift right; the
    /// new key's left child slot is cleared for the caller to fill. If the key
    /// already exists, nothing changes and its slot is returned.
    ///
    /// # Errors
    /// Returns `Error::StructuralViolation` on a leaf or a full node.
    pub fn add_key(&mut self, key: &Key) -> Result<usize> {
        self.ensure_type(NodeType::Internal, "add_key")?;
        let index = match self.search(key) {
            Ok(existing) => return Ok(existing),
            Err(index) => index,
        };
        self.ensure_room()?;

        let count = self.count();
        for i in (index..count).rev() {
            self.move_key(i, i + 1);
        }
        for i in (index + 1..=count + 1).rev() {
            self.move_value(i - 1, i);
        }

        self.set_key(index, key);
        self.set_value(index, BlockId::INVALID.0);
        self.set_count(count + 1);
        Ok(index)
    }

    /// Insert a key/value pair into a leaf.
    ///
    /// Duplicates are rejected: if the key already exists, nothing changes
    /// and its slot is returned.
    ///
    /// # Errors
    /// Returns `Error::StructuralViolation` on an internal or a full node.
    pub fn add_entry(&mut self, key: &Key, value: u32) -> Result<usize> {
        self.ensure_type(NodeType::Leaf, "add_entry")?;
        let index = match self.search(key) {
            Ok(existing) => return Ok(existing),
            Err(index) => index,
        };
        self.ensure_room()?;

        let count = self.count();
        for i in (index..count).rev() {
            self.move_key(i, i + 1);
            self.move_value(i, i + 1);
        }

        self.set_key(index, key);
        self.set_value(index, value);
        self.set_count(count + 1);
        Ok(index)
    }

    /// Remove the key in `index` and the value in `index`.
    ///
    /// For an internal node that is the child left of the removed key; the
    /// caller re-points the surviving slot after a merge. Returns `false` if
    /// `index` is not occupied.
    pub fn remove(&mut self, index: usize) -> bool {
        let count = self.count();
        if index >= count {
            return false;
        }

        if self.is_leaf() {
            for i in index..count - 1 {
                self.move_key(i + 1, i);
                self.move_value(i + 1, i);
            }
        } else {
            for i in index..count - 1 {
                self.move_key(i + 1, i);
            }
            for i in index..count {
                self.move_value(i + 1, i);
            }
        }

        self.set_count(count - 1);
        true
    }

    /// Prepend a key with its value (leaf) or leftmost child (internal).
    ///
    /// # Errors
    /// Returns `Error::StructuralViolation` if the node is full.
    pub fn push_front(&mut self, key: &Key, value: u32) -> Result<()> {
        self.ensure_room()?;
        let count = self.count();

        for i in (0..count).rev() {
            self.move_key(i, i + 1);
        }
        let last_value = if self.is_leaf() { count } else { count + 1 };
        for i in (1..=last_value).rev() {
            self.move_value(i - 1, i);
        }

        self.set_key(0, key);
        self.set_value(0, value);
        self.set_count(count + 1);
        Ok(())
    }

    /// Append a key with its value (leaf) or rightmost child (internal).
    ///
    /// # Errors
    /// Returns `Error::StructuralViolation` if the node is full.
    pub fn push_back(&mut self, key: &Key, value: u32) -> Result<()> {
        self.ensure_room()?;
        let count = self.count();

        self.set_key(count, key);
        if self.is_leaf() {
            self.set_value(count, value);
        } else {
            self.set_value(count + 1, value);
        }
        self.set_count(count + 1);
        Ok(())
    }

    /// Split a full node around slot `rank`.
    ///
    /// Returns the separator to promote and the new right sibling (block id
    /// `sibling_id`, same parent as this node).
    ///
    /// - Leaf: this node keeps slots `[0, rank]`, so the promoted key stays
    ///   here as its maximum; slots `(rank, degree)` move to the sibling,
    ///   which is linked into the chain right after this node.
    /// - Internal: this node keeps keys `[0, rank)` and children `[0, rank]`;
    ///   keys `(rank, degree)` and children `(rank, degree]` move. The caller
    ///   must repoint the moved children's parent to the sibling.
    ///
    /// # Errors
    /// Returns `Error::StructuralViolation` unless the node holds exactly
    /// `degree` keys.
    pub fn split(&mut self, sibling_id: BlockId) -> Result<(Key, Node)> {
        let degree = self.layout.degree();
        let rank = self.layout.rank();
        if self.count() != degree {
            return Err(Error::structural(format!(
                "split of {} with {} keys, degree is {}",
                self.id,
                self.count(),
                degree
            )));
        }

        let promoted = self.key(rank);
        let mut sibling = Node::create(sibling_id, self.layout, self.node_type());
        sibling.set_parent(self.parent());

        for i in rank + 1..degree {
            sibling.set_key_bytes(i - rank - 1, self.key_bytes(i));
        }

        if self.is_leaf() {
            for i in rank + 1..degree {
                sibling.set_value(i - rank - 1, self.value(i));
            }
            sibling.set_count(rank);
            self.set_count(rank + 1);

            sibling.set_next_leaf(self.next_leaf());
            self.set_next_leaf(Some(sibling_id));
        } else {
            for i in rank + 1..=degree {
                sibling.set_value(i - rank - 1, self.value(i));
            }
            sibling.set_count(rank);
            self.set_count(rank);
        }

        Ok((promoted, sibling))
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("type", &self.node_type())
            .field("count", &self.count())
            .field("parent", &self.parent())
            .field("keys", &self.keys())
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
