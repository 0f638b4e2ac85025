//! B+ tree orchestration: descent, insertion with cascading splits and
//! deletion with cascading borrow/merge.
//!
//! Nodes are addressed by block id. Every step loads the nodes it needs from
//! the [`BlockStore`], mutates them and writes them back before moving up a
//! level, so no node outlives the step that loaded it. Cascades climb the
//! tree in a loop bounded by the descriptor's `level`.
//!
//! Separator invariant: internal key `i` equals the largest key stored in the
//! subtree of child `i`. Descent sends a key equal to a separator left.

use std::cmp::Ordering;

use crate::common::{BlockId, Error, Result};
use crate::index::btree::descriptor::IndexDescriptor;
use crate::index::btree::key::Key;
use crate::index::btree::layout::NodeLayout;
use crate::index::btree::locator::RowLocator;
use crate::index::btree::node::{Node, NodeType};
use crate::storage::BlockStore;

/// Result of a descent: the node that holds or would hold a key.
///
/// `index` is the matching slot when `found`, otherwise the insertion point.
#[derive(Debug)]
pub struct Lookup {
    pub node: Node,
    pub index: usize,
    pub found: bool,
}

/// A B+ tree index over a block store.
///
/// The tree takes the descriptor by value for as long as it operates on the
/// index; hand it back to the catalog with [`into_parts`](Self::into_parts).
/// There is no internal locking: callers serialize access to one index.
///
/// # Example
/// ```
/// use blockindex::index::btree::{BPlusTree, IndexDescriptor, Key, KeyType};
/// use blockindex::storage::MemoryBlockStore;
///
/// let descriptor = IndexDescriptor::new("users_id", KeyType::Int, 4)?.with_rank(2)?;
/// let mut tree = BPlusTree::new(descriptor, MemoryBlockStore::new())?;
///
/// assert!(tree.insert(&Key::int(7), 3, 128)?);
/// assert!(!tree.insert(&Key::int(7), 9, 9)?);
///
/// let loc = tree.point_query(&Key::int(7))?.unwrap();
/// assert_eq!((loc.block_num(), loc.offset()), (3, 128));
/// # Ok::<(), blockindex::Error>(())
/// ```
pub struct BPlusTree<S: BlockStore> {
    descriptor: IndexDescriptor,
    store: S,
    layout: NodeLayout,
}

impl<S: BlockStore> BPlusTree<S> {
    /// Attach a descriptor to the store holding its nodes.
    ///
    /// # Errors
    /// Returns `Error::InvalidLayout` if the descriptor's geometry does not
    /// fit a block.
    pub fn new(descriptor: IndexDescriptor, store: S) -> Result<Self> {
        let layout = descriptor.layout()?;
        Ok(Self {
            descriptor,
            store,
            layout,
        })
    }

    pub fn descriptor(&self) -> &IndexDescriptor {
        &self.descriptor
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    /// Release the descriptor and store.
    pub fn into_parts(self) -> (IndexDescriptor, S) {
        (self.descriptor, self.store)
    }

    /// Number of keys in the index.
    pub fn len(&self) -> usize {
        self.descriptor.key_count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.descriptor.is_empty()
    }

    // ========================================================================
    // Node I/O
    // ========================================================================

    pub(super) fn load(&mut self, id: BlockId) -> Result<Node> {
        let block = self.store.read_block(id)?;
        Node::open(id, self.layout, block)
    }

    fn save(&mut self, node: &Node) -> Result<()> {
        self.store.write_block(node.id(), node.block())
    }

    fn set_parent(&mut self, child: BlockId, parent: BlockId) -> Result<()> {
        let mut node = self.load(child)?;
        node.set_parent(Some(parent));
        self.save(&node)
    }

    fn discard(&mut self, node: Node) -> Result<()> {
        self.store.discard_block(node.id())
    }

    pub(super) fn root_id(&self) -> Result<BlockId> {
        self.descriptor
            .root
            .ok_or_else(|| Error::structural("descent into an empty index"))
    }

    pub(super) fn leaf_head_id(&self) -> Result<BlockId> {
        self.descriptor
            .leaf_head
            .ok_or_else(|| Error::structural("populated index without a leaf head"))
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Descend from the root to the leaf that holds or would hold `key`.
    ///
    /// After an exact separator match the key must be the last entry of the
    /// rightmost leaf under the matched child.
    ///
    /// # Errors
    /// Returns `Error::StructuralViolation` if the index is empty, the
    /// descent is deeper than `level`, or a matched separator has no leaf
    /// entry.
    pub fn locate_leaf(&mut self, key: &Key) -> Result<Lookup> {
        let mut id = self.root_id()?;
        let mut matched = false;

        for _ in 0..self.descriptor.level {
            let node = self.load(id)?;

            if node.is_leaf() {
                return Self::leaf_lookup(node, key, matched);
            }

            if node.count() == 0 {
                let head = self.load(self.leaf_head_id()?)?;
                return Ok(Lookup {
                    node: head,
                    index: 0,
                    found: false,
                });
            }

            id = if matched {
                node.child(node.count())?
            } else {
                match node.search(key) {
                    Ok(i) => {
                        matched = true;
                        node.child(i)?
                    }
                    Err(i) => node.child(i)?,
                }
            };
        }

        Err(Error::structural(format!(
            "no leaf reached within {} levels",
            self.descriptor.level
        )))
    }

    fn leaf_lookup(leaf: Node, key: &Key, matched: bool) -> Result<Lookup> {
        if matched {
            let count = leaf.count();
            if count == 0 || leaf.compare(key, count - 1) != Ordering::Equal {
                return Err(Error::structural(format!(
                    "separator {} has no entry at the end of {}",
                    key,
                    leaf.id()
                )));
            }
            return Ok(Lookup {
                node: leaf,
                index: count - 1,
                found: true,
            });
        }

        let (index, found) = match leaf.search(key) {
            Ok(i) => (i, true),
            Err(i) => (i, false),
        };
        Ok(Lookup {
            node: leaf,
            index,
            found,
        })
    }

    /// Find the internal node holding `key` as a separator.
    ///
    /// `found` is false when the descent reaches leaf depth without a match;
    /// the returned node is then the last internal node visited.
    ///
    /// # Errors
    /// Returns `Error::StructuralViolation` if the root is a leaf.
    pub fn locate_for_structural_fix(&mut self, key: &Key) -> Result<Lookup> {
        let mut node = self.load(self.root_id()?)?;
        if node.is_leaf() {
            return Err(Error::structural(format!(
                "separator lookup for {} started at leaf {}",
                key,
                node.id()
            )));
        }

        for _ in 0..self.descriptor.level {
            let index = match node.search(key) {
                Ok(i) => {
                    return Ok(Lookup {
                        node,
                        index: i,
                        found: true,
                    })
                }
                Err(i) => i,
            };

            let child = self.load(node.child(index)?)?;
            if child.is_leaf() {
                return Ok(Lookup {
                    node,
                    index,
                    found: false,
                });
            }
            node = child;
        }

        Err(Error::structural(format!(
            "no leaf reached within {} levels",
            self.descriptor.level
        )))
    }

    /// Row locator stored for `key`, if any.
    ///
    /// # Errors
    /// Returns `Error::KeyMismatch` if the key does not match the index.
    pub fn point_query(&mut self, key: &Key) -> Result<Option<RowLocator>> {
        self.layout.check_key(key)?;
        if self.descriptor.is_empty() {
            return Ok(None);
        }

        let lookup = self.locate_leaf(key)?;
        Ok(lookup
            .found
            .then(|| lookup.node.locator(lookup.index)))
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Map `key` to the row at (`block_num`, `offset`).
    ///
    /// Returns `false` without touching the index if the key already exists.
    ///
    /// # Errors
    /// Returns `Error::KeyMismatch` for a foreign key,
    /// `Error::LocatorOutOfRange` if either locator half exceeds 16 bits, and
    /// storage errors from the block store.
    pub fn insert(&mut self, key: &Key, block_num: u32, offset: u32) -> Result<bool> {
        self.layout.check_key(key)?;
        let locator = RowLocator::new(block_num, offset)?;
        tracing::trace!(key = %key, locator = %locator, "insert");

        if self.descriptor.is_empty() {
            let id = self.descriptor.allocate_block()?;
            let root = Node::create(id, self.layout, NodeType::Leaf);
            self.save(&root)?;

            self.descriptor.root = Some(id);
            self.descriptor.leaf_head = Some(id);
            self.descriptor.node_count = 1;
            self.descriptor.level = 1;
        }

        let Lookup {
            node: mut leaf,
            found,
            ..
        } = self.locate_leaf(key)?;
        if found {
            return Ok(false);
        }

        leaf.add_entry(key, locator.pack())?;
        self.descriptor.key_count += 1;

        if leaf.count() == self.layout.degree() {
            self.split_cascade(leaf)?;
        } else {
            self.save(&leaf)?;
        }
        Ok(true)
    }

    /// Split `node` and push the separator up until a parent has room.
    fn split_cascade(&mut self, mut node: Node) -> Result<()> {
        for _ in 0..=self.descriptor.level {
            let sibling_id = self.descriptor.allocate_block()?;
            let (promoted, sibling) = node.split(sibling_id)?;
            self.descriptor.node_count += 1;

            if !sibling.is_leaf() {
                for child in sibling.children()? {
                    self.set_parent(child, sibling_id)?;
                }
            }

            tracing::debug!(
                node = %node.id(),
                sibling = %sibling_id,
                promoted = %promoted,
                leaf = node.is_leaf(),
                "split"
            );

            let Some(parent_id) = node.parent() else {
                return self.grow_root(node, sibling, &promoted);
            };

            self.save(&node)?;
            self.save(&sibling)?;

            let mut parent = self.load(parent_id)?;
            let index = parent.add_key(&promoted)?;
            parent.set_child(index, node.id());
            parent.set_child(index + 1, sibling_id);

            if parent.count() < self.layout.degree() {
                return self.save(&parent);
            }
            node = parent;
        }

        Err(Error::structural(format!(
            "split cascade exceeded {} levels",
            self.descriptor.level
        )))
    }

    /// Put a new root above a split root.
    fn grow_root(&mut self, mut left: Node, mut right: Node, promoted: &Key) -> Result<()> {
        let root_id = self.descriptor.allocate_block()?;
        let mut root = Node::create(root_id, self.layout, NodeType::Internal);
        root.add_key(promoted)?;
        root.set_child(0, left.id());
        root.set_child(1, right.id());

        left.set_parent(Some(root_id));
        right.set_parent(Some(root_id));
        self.save(&left)?;
        self.save(&right)?;
        self.save(&root)?;

        self.descriptor.root = Some(root_id);
        self.descriptor.node_count += 1;
        self.descriptor.level += 1;

        tracing::debug!(root = %root_id, level = self.descriptor.level, "new root");
        Ok(())
    }

    // ========================================================================
    // Deletion
    // ========================================================================

    /// Remove `key` from the index.
    ///
    /// Returns `false` if the index is empty or the key is absent.
    ///
    /// # Errors
    /// Returns `Error::KeyMismatch` for a foreign key and
    /// `Error::StructuralViolation` if the tree is found inconsistent.
    pub fn delete(&mut self, key: &Key) -> Result<bool> {
        self.layout.check_key(key)?;
        if self.descriptor.is_empty() {
            return Ok(false);
        }

        let Lookup {
            node: mut leaf,
            index,
            found,
        } = self.locate_leaf(key)?;
        if !found {
            return Ok(false);
        }
        tracing::trace!(key = %key, leaf = %leaf.id(), "delete");

        let count = leaf.count();
        let mut stale_separator = false;

        if !leaf.is_root() && index == count - 1 {
            if count >= 2 {
                // Ancestor separator takes the leaf's next largest key.
                let new_max = leaf.key(count - 2);
                let fix = self.locate_for_structural_fix(key)?;
                if fix.found {
                    let mut holder = fix.node;
                    holder.set_key(fix.index, &new_max);
                    self.save(&holder)?;
                    tracing::debug!(node = %holder.id(), separator = %new_max, "separator rewritten");
                }
            } else {
                stale_separator = true;
            }
        }

        leaf.remove(index);
        self.save(&leaf)?;
        self.descriptor.key_count -= 1;

        self.merge_cascade(leaf)?;

        if stale_separator {
            self.refresh_separator(key)?;
        }
        Ok(true)
    }

    /// Rebalance an underfull node, climbing while merges leave the parent
    /// underfull.
    fn merge_cascade(&mut self, mut node: Node) -> Result<()> {
        let rank = self.layout.rank();

        for _ in 0..=self.descriptor.level {
            let Some(parent_id) = node.parent() else {
                if node.count() == 0 {
                    self.collapse_root(node)?;
                }
                return Ok(());
            };
            if node.count() >= rank {
                return Ok(());
            }

            let mut parent = self.load(parent_id)?;
            let pos = Self::position_in_parent(&parent, &node)?;

            if pos == parent.count() {
                let mut sibling = self.load(parent.child(pos - 1)?)?;
                if sibling.count() > rank {
                    return self.borrow_from_left(&mut node, &mut sibling, &mut parent, pos);
                }
                self.merge_into_left(node, &mut sibling, &mut parent, pos)?;
            } else {
                let mut sibling = self.load(parent.child(pos + 1)?)?;
                if sibling.count() > rank {
                    return self.borrow_from_right(&mut node, &mut sibling, &mut parent, pos);
                }
                self.merge_from_right(&mut node, sibling, &mut parent, pos)?;
            }

            self.save(&parent)?;
            node = parent;
        }

        Err(Error::structural(format!(
            "merge cascade exceeded {} levels",
            self.descriptor.level
        )))
    }

    /// Child slot of `node` in `parent`.
    fn position_in_parent(parent: &Node, node: &Node) -> Result<usize> {
        if node.count() > 0 {
            let guess = match parent.search(&node.key(0)) {
                Ok(i) | Err(i) => i,
            };
            if parent.child(guess)? == node.id() {
                return Ok(guess);
            }
        }

        for i in 0..=parent.count() {
            if parent.child(i)? == node.id() {
                return Ok(i);
            }
        }
        Err(Error::structural(format!(
            "{} is not a child of its parent {}",
            node.id(),
            parent.id()
        )))
    }

    /// Drop an empty root: its only child takes over, or the index empties.
    fn collapse_root(&mut self, root: Node) -> Result<()> {
        if root.is_leaf() {
            self.descriptor.root = None;
            self.descriptor.leaf_head = None;
        } else {
            let child_id = root.child(0)?;
            let mut child = self.load(child_id)?;
            child.set_parent(None);
            self.save(&child)?;
            self.descriptor.root = Some(child_id);
        }

        self.descriptor.node_count -= 1;
        self.descriptor.level -= 1;
        tracing::debug!(old_root = %root.id(), root = ?self.descriptor.root, "root collapsed");
        self.discard(root)
    }

    /// Move the left sibling's last entry to the front of `node`.
    fn borrow_from_left(
        &mut self,
        node: &mut Node,
        sibling: &mut Node,
        parent: &mut Node,
        pos: usize,
    ) -> Result<()> {
        let last = sibling.count() - 1;

        // New maximum of the sibling once its last entry is gone.
        let separator = if node.is_leaf() {
            node.push_front(&sibling.key(last), sibling.value(last))?;
            sibling.key(last - 1)
        } else {
            let moved = sibling.child(last + 1)?;
            node.push_front(&parent.key(pos - 1), moved.0)?;
            self.set_parent(moved, node.id())?;
            sibling.key(last)
        };

        sibling.set_count(last);
        parent.set_key(pos - 1, &separator);

        tracing::debug!(node = %node.id(), from = %sibling.id(), "borrowed from left");
        self.save(node)?;
        self.save(sibling)?;
        self.save(parent)
    }

    /// Move the right sibling's first entry to the end of `node`.
    fn borrow_from_right(
        &mut self,
        node: &mut Node,
        sibling: &mut Node,
        parent: &mut Node,
        pos: usize,
    ) -> Result<()> {
        let first = sibling.key(0);

        if node.is_leaf() {
            node.push_back(&first, sibling.value(0))?;
        } else {
            let moved = sibling.child(0)?;
            node.push_back(&parent.key(pos), moved.0)?;
            self.set_parent(moved, node.id())?;
        }

        parent.set_key(pos, &first);
        sibling.remove(0);

        tracing::debug!(node = %node.id(), from = %sibling.id(), "borrowed from right");
        self.save(node)?;
        self.save(sibling)?;
        self.save(parent)
    }

    /// Append `node` to its left sibling and drop it.
    ///
    /// The caller saves the parent.
    fn merge_into_left(
        &mut self,
        node: Node,
        sibling: &mut Node,
        parent: &mut Node,
        pos: usize,
    ) -> Result<()> {
        if node.is_leaf() {
            for i in 0..node.count() {
                sibling.push_back(&node.key(i), node.value(i))?;
            }
            sibling.set_next_leaf(node.next_leaf());
        } else {
            sibling.push_back(&parent.key(pos - 1), node.child(0)?.0)?;
            for i in 0..node.count() {
                sibling.push_back(&node.key(i), node.child(i + 1)?.0)?;
            }
            for child in node.children()? {
                self.set_parent(child, sibling.id())?;
            }
        }

        parent.remove(pos - 1);
        parent.set_child(pos - 1, sibling.id());
        self.save(sibling)?;

        self.descriptor.node_count -= 1;
        tracing::debug!(node = %node.id(), into = %sibling.id(), "merged into left");
        self.discard(node)
    }

    /// Append the right sibling to `node` and drop the sibling.
    ///
    /// The caller saves the parent.
    fn merge_from_right(
        &mut self,
        node: &mut Node,
        sibling: Node,
        parent: &mut Node,
        pos: usize,
    ) -> Result<()> {
        if node.is_leaf() {
            for i in 0..sibling.count() {
                node.push_back(&sibling.key(i), sibling.value(i))?;
            }
            node.set_next_leaf(sibling.next_leaf());
        } else {
            node.push_back(&parent.key(pos), sibling.child(0)?.0)?;
            for i in 0..sibling.count() {
                node.push_back(&sibling.key(i), sibling.child(i + 1)?.0)?;
            }
            for child in sibling.children()? {
                self.set_parent(child, node.id())?;
            }
        }

        parent.remove(pos);
        parent.set_child(pos, node.id());
        self.save(node)?;

        self.descriptor.node_count -= 1;
        tracing::debug!(node = %node.id(), absorbed = %sibling.id(), "merged from right");
        self.discard(sibling)
    }

    /// Rewrite a separator equal to a deleted key to the maximum of its left
    /// subtree, if one survived rebalancing.
    fn refresh_separator(&mut self, key: &Key) -> Result<()> {
        let Some(root) = self.descriptor.root else {
            return Ok(());
        };
        if self.load(root)?.is_leaf() {
            return Ok(());
        }

        let fix = self.locate_for_structural_fix(key)?;
        if !fix.found {
            return Ok(());
        }

        let mut holder = fix.node;
        let max = self.subtree_max(holder.child(fix.index)?)?;
        if let Some(max) = max {
            holder.set_key(fix.index, &max);
            self.save(&holder)?;
            tracing::debug!(node = %holder.id(), separator = %max, "separator rewritten");
        }
        Ok(())
    }

    /// Largest key under `id`, following rightmost children.
    pub(super) fn subtree_max(&mut self, id: BlockId) -> Result<Option<Key>> {
        let mut node = self.load(id)?;
        for _ in 0..self.descriptor.level {
            if node.is_leaf() {
                let count = node.count();
                return Ok((count > 0).then(|| node.key(count - 1)));
            }
            node = self.load(node.child(node.count())?)?;
        }
        Err(Error::structural(format!(
            "no leaf below {} within {} levels",
            id, self.descriptor.level
        )))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::btree::key::KeyType;
    use crate::storage::MemoryBlockStore;

    fn tree(rank: usize) -> BPlusTree<MemoryBlockStore> {
        let descriptor = IndexDescriptor::new("t", KeyType::Int, 4)
            .unwrap()
            .with_rank(rank)
            .unwrap();
        BPlusTree::new(descriptor, MemoryBlockStore::new()).unwrap()
    }

    fn leaf_keys(tree: &mut BPlusTree<MemoryBlockStore>) -> Vec<Vec<i32>> {
        let mut leaves = Vec::new();
        let mut next = tree.descriptor().leaf_head();
        while let Some(id) = next {
            let leaf = tree.load(id).unwrap();
            leaves.push(leaf.keys().iter().map(|k| k.as_int().unwrap()).collect());
            next = leaf.next_leaf();
        }
        leaves
    }

    /// Keys of every node, level by level from the root.
    fn levels(tree: &mut BPlusTree<MemoryBlockStore>) -> Vec<Vec<Vec<i32>>> {
        let mut levels = Vec::new();
        let mut current: Vec<BlockId> = tree.descriptor().root().into_iter().collect();
        while !current.is_empty() {
            let mut keys = Vec::new();
            let mut below = Vec::new();
            for id in current {
                let node = tree.load(id).unwrap();
                keys.push(node.keys().iter().map(|k| k.as_int().unwrap()).collect());
                if !node.is_leaf() {
                    below.extend(node.children().unwrap());
                }
            }
            levels.push(keys);
            current = below;
        }
        levels
    }

    fn filled(rank: usize, keys: impl IntoIterator<Item = i32>) -> BPlusTree<MemoryBlockStore> {
        let mut tree = tree(rank);
        for k in keys {
            tree.insert(&Key::int(k), 0, k as u32).unwrap();
        }
        tree
    }

    #[test]
    fn test_first_insert_creates_root_leaf() {
        let mut tree = tree(1);
        assert!(tree.insert(&Key::int(1), 0, 0).unwrap());

        let d = tree.descriptor();
        assert_eq!(d.root(), Some(BlockId::new(0)));
        assert_eq!(d.leaf_head(), Some(BlockId::new(0)));
        assert_eq!((d.key_count(), d.node_count(), d.level()), (1, 1, 1));
    }

    #[test]
    fn test_split_shape_rank_one() {
        let mut tree = tree(1);
        for k in 1..=5 {
            assert!(tree.insert(&Key::int(k), 0, k as u32).unwrap());
        }

        assert_eq!(leaf_keys(&mut tree), vec![vec![1, 2], vec![3, 4], vec![5]]);
        let d = tree.descriptor().clone();
        assert_eq!((d.key_count(), d.node_count(), d.level()), (5, 4, 2));

        let root = tree.load(d.root().unwrap()).unwrap();
        assert_eq!(root.keys(), vec![Key::int(2), Key::int(4)]);
        assert!(root.is_root());
    }

    #[test]
    fn test_split_reparents_children() {
        let mut tree = tree(1);
        for k in 1..=9 {
            tree.insert(&Key::int(k), 0, 0).unwrap();
        }
        assert_eq!(tree.descriptor().level(), 3);

        let root_id = tree.descriptor().root().unwrap();
        let root = tree.load(root_id).unwrap();
        for child_id in root.children().unwrap() {
            let child = tree.load(child_id).unwrap();
            assert_eq!(child.parent(), Some(root_id));
            for grandchild in child.children().unwrap() {
                assert_eq!(tree.load(grandchild).unwrap().parent(), Some(child_id));
            }
        }
    }

    #[test]
    fn test_locate_leaf_exact_separator() {
        let mut tree = tree(1);
        for k in 1..=5 {
            tree.insert(&Key::int(k), 0, 0).unwrap();
        }

        let lookup = tree.locate_leaf(&Key::int(2)).unwrap();
        assert!(lookup.found);
        assert_eq!(lookup.index, 1);
        assert_eq!(lookup.node.key(1), Key::int(2));

        let lookup = tree.locate_leaf(&Key::int(6)).unwrap();
        assert!(!lookup.found);
        assert_eq!(lookup.index, 1);
    }

    #[test]
    fn test_locate_for_structural_fix_on_leaf_root_fails() {
        let mut tree = tree(1);
        tree.insert(&Key::int(1), 0, 0).unwrap();
        match tree.locate_for_structural_fix(&Key::int(1)) {
            Err(Error::StructuralViolation(_)) => {}
            other => panic!("Expected StructuralViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_delete_last_slot_rewrites_separator() {
        let mut tree = tree(1);
        for k in 1..=5 {
            tree.insert(&Key::int(k), 0, 0).unwrap();
        }

        // 2 is the last key of the first leaf and the root separator.
        assert!(tree.delete(&Key::int(2)).unwrap());

        let root = tree.load(tree.descriptor().root().unwrap()).unwrap();
        assert!(!root.keys().contains(&Key::int(2)));
        assert_eq!(tree.point_query(&Key::int(2)).unwrap(), None);
        assert!(tree.point_query(&Key::int(1)).unwrap().is_some());
        assert_eq!(tree.descriptor().key_count(), 4);
    }

    #[test]
    fn test_delete_borrows_from_right() {
        let mut tree = tree(1);
        for k in [1, 2, 3, 4, 5, 6] {
            tree.insert(&Key::int(k), 0, 0).unwrap();
        }
        // Leaves [1,2] [3,4] [5,6]
        tree.delete(&Key::int(1)).unwrap();
        tree.delete(&Key::int(2)).unwrap();

        assert_eq!(leaf_keys(&mut tree), vec![vec![3], vec![4], vec![5, 6]]);
    }

    #[test]
    fn test_delete_leaf_borrows_from_left() {
        let mut tree = filled(1, 1..=5);
        assert_eq!(
            levels(&mut tree),
            vec![vec![vec![2, 4]], vec![vec![1, 2], vec![3, 4], vec![5]]]
        );

        // The last leaf empties; its left sibling can spare 4.
        tree.delete(&Key::int(5)).unwrap();

        assert_eq!(
            levels(&mut tree),
            vec![vec![vec![2, 3]], vec![vec![1, 2], vec![3], vec![4]]]
        );
        assert_eq!(tree.descriptor().node_count(), 4);
        tree.validate().unwrap();
    }

    #[test]
    fn test_delete_leaf_merges_into_left() {
        let mut tree = filled(1, 1..=5);
        tree.delete(&Key::int(5)).unwrap();
        tree.delete(&Key::int(4)).unwrap();

        assert_eq!(levels(&mut tree), vec![vec![vec![2]], vec![vec![1, 2], vec![3]]]);
        assert_eq!(tree.descriptor().node_count(), 3);
        assert_eq!(tree.point_query(&Key::int(3)).unwrap().map(|l| l.offset()), Some(3));
        tree.validate().unwrap();
    }

    #[test]
    fn test_delete_leaf_merges_from_right() {
        let mut tree = filled(1, 1..=5);
        for k in [3, 1, 2] {
            tree.delete(&Key::int(k)).unwrap();
        }

        assert_eq!(levels(&mut tree), vec![vec![vec![4]], vec![vec![4], vec![5]]]);
        assert_eq!(tree.descriptor().node_count(), 3);
        tree.validate().unwrap();
    }

    #[test]
    fn test_delete_internal_borrows_from_right() {
        let mut tree = filled(1, 1..=9);
        assert_eq!(
            levels(&mut tree),
            vec![
                vec![vec![4]],
                vec![vec![2], vec![6, 8]],
                vec![vec![1, 2], vec![3, 4], vec![5, 6], vec![7, 8], vec![9]],
            ]
        );

        // Emptying the first internal node pulls the right sibling's first child over.
        for k in [3, 1, 2] {
            tree.delete(&Key::int(k)).unwrap();
        }

        assert_eq!(
            levels(&mut tree),
            vec![
                vec![vec![6]],
                vec![vec![4], vec![8]],
                vec![vec![4], vec![5, 6], vec![7, 8], vec![9]],
            ]
        );
        tree.validate().unwrap();
    }

    #[test]
    fn test_delete_internal_merges_from_right_and_collapses_root() {
        let mut tree = filled(1, 1..=8);
        assert_eq!(
            levels(&mut tree),
            vec![
                vec![vec![4]],
                vec![vec![2], vec![6]],
                vec![vec![1, 2], vec![3, 4], vec![5, 6], vec![7, 8]],
            ]
        );

        for k in [3, 1, 2] {
            tree.delete(&Key::int(k)).unwrap();
        }

        assert_eq!(
            levels(&mut tree),
            vec![vec![vec![4, 6]], vec![vec![4], vec![5, 6], vec![7, 8]]]
        );
        let d = tree.descriptor().clone();
        assert_eq!((d.node_count(), d.level()), (4, 2));
        assert!(tree.load(d.root().unwrap()).unwrap().is_root());
        tree.validate().unwrap();
    }

    #[test]
    fn test_delete_internal_borrows_from_left() {
        let mut tree = filled(1, (4..=9).rev());
        assert_eq!(
            levels(&mut tree),
            vec![
                vec![vec![7]],
                vec![vec![5, 6], vec![8]],
                vec![vec![4, 5], vec![6], vec![7], vec![8], vec![9]],
            ]
        );

        // The last internal node empties; its left sibling hands over leaf [7].
        tree.delete(&Key::int(9)).unwrap();

        assert_eq!(
            levels(&mut tree),
            vec![
                vec![vec![6]],
                vec![vec![5], vec![7]],
                vec![vec![4, 5], vec![6], vec![7], vec![8]],
            ]
        );
        tree.validate().unwrap();
    }

    #[test]
    fn test_delete_internal_merges_into_left_and_collapses_root() {
        let mut tree = filled(1, (5..=9).rev());
        assert_eq!(
            levels(&mut tree),
            vec![
                vec![vec![7]],
                vec![vec![6], vec![8]],
                vec![vec![5, 6], vec![7], vec![8], vec![9]],
            ]
        );

        tree.delete(&Key::int(9)).unwrap();

        assert_eq!(
            levels(&mut tree),
            vec![vec![vec![6, 7]], vec![vec![5, 6], vec![7], vec![8]]]
        );
        assert_eq!(tree.descriptor().level(), 2);
        assert_eq!(leaf_keys(&mut tree), vec![vec![5, 6], vec![7], vec![8]]);
        tree.validate().unwrap();
    }

    #[test]
    fn test_delete_merges_and_collapses_root() {
        let mut tree = tree(1);
        for k in 1..=3 {
            tree.insert(&Key::int(k), 0, 0).unwrap();
        }
        assert_eq!(tree.descriptor().level(), 2);

        tree.delete(&Key::int(3)).unwrap();
        tree.delete(&Key::int(2)).unwrap();

        let d = tree.descriptor().clone();
        assert_eq!((d.key_count(), d.node_count(), d.level()), (1, 1, 1));
        assert_eq!(d.root(), d.leaf_head());
        assert_eq!(leaf_keys(&mut tree), vec![vec![1]]);
        assert!(tree.load(d.root().unwrap()).unwrap().is_root());
    }

    #[test]
    fn test_delete_everything_empties_index() {
        let mut tree = tree(2);
        for k in 0..40 {
            tree.insert(&Key::int(k), 0, 0).unwrap();
        }
        for k in 0..40 {
            assert!(tree.delete(&Key::int(k)).unwrap(), "delete {k}");
        }

        let d = tree.descriptor();
        assert!(d.is_empty());
        assert_eq!((d.key_count(), d.node_count(), d.level()), (0, 0, 0));
        assert_eq!(d.leaf_head(), None);
        assert_eq!(tree.store().block_count(), 0);
    }

    #[test]
    fn test_delete_absent_and_empty() {
        let mut tree = tree(1);
        assert!(!tree.delete(&Key::int(1)).unwrap());

        tree.insert(&Key::int(1), 0, 0).unwrap();
        assert!(!tree.delete(&Key::int(2)).unwrap());
        assert_eq!(tree.descriptor().key_count(), 1);
    }

    #[test]
    fn test_key_mismatch_rejected() {
        let mut tree = tree(1);
        match tree.insert(&Key::float(1.0), 0, 0) {
            Err(Error::KeyMismatch { .. }) => {}
            other => panic!("Expected KeyMismatch, got {:?}", other),
        }
        assert!(tree.is_empty());
    }

    #[test]
    fn test_locator_out_of_range_leaves_tree_untouched() {
        let mut tree = tree(1);
        assert!(tree.insert(&Key::int(1), 0, 70_000).is_err());
        assert!(tree.is_empty());
        assert_eq!(tree.descriptor().block_count(), 0);
    }
}
