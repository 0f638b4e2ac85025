//! Whole-tree diagnostics: structural audit, debug dump and full scan.

use crate::common::{BlockId, Error, Result};
use crate::index::btree::key::Key;
use crate::index::btree::locator::RowLocator;
use crate::index::btree::tree::BPlusTree;
use crate::storage::BlockStore;

/// Counts gathered by [`BPlusTree::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeShape {
    pub keys: usize,
    pub nodes: usize,
    pub height: usize,
    pub leaves: usize,
}

/// Pending node of a pre-order walk, with the key range it must respect.
struct Visit {
    id: BlockId,
    parent: Option<BlockId>,
    lower: Option<Key>,
    upper: Option<Key>,
    depth: usize,
}

fn violation(msg: String) -> Error {
    Error::StructuralViolation(msg)
}

impl<S: BlockStore> BPlusTree<S> {
    /// Audit every node reachable from the root.
    ///
    /// Checks parent links, key order, occupancy, separator values, uniform
    /// leaf depth, the leaf chain and the descriptor counters.
    ///
    /// # Errors
    /// Returns `Error::StructuralViolation` describing the first problem.
    pub fn validate(&mut self) -> Result<TreeShape> {
        let descriptor = self.descriptor().clone();
        let Some(root) = descriptor.root() else {
            if descriptor.key_count() != 0
                || descriptor.node_count() != 0
                || descriptor.leaf_head().is_some()
            {
                return Err(violation(format!(
                    "empty index with {} keys, {} nodes, leaf head {:?}",
                    descriptor.key_count(),
                    descriptor.node_count(),
                    descriptor.leaf_head()
                )));
            }
            return Ok(TreeShape::default());
        };

        let rank = self.layout().rank();
        let degree = self.layout().degree();
        let level = descriptor.level() as usize;

        let mut shape = TreeShape::default();
        let mut leaves = Vec::new();
        let mut stack = vec![Visit {
            id: root,
            parent: None,
            lower: None,
            upper: None,
            depth: 1,
        }];

        while let Some(visit) = stack.pop() {
            if visit.depth > level {
                return Err(violation(format!(
                    "{} at depth {} below level {}",
                    visit.id, visit.depth, level
                )));
            }

            let node = self.load(visit.id)?;
            shape.nodes += 1;

            if node.parent() != visit.parent {
                return Err(violation(format!(
                    "{} has parent {:?}, expected {:?}",
                    node.id(),
                    node.parent(),
                    visit.parent
                )));
            }

            let count = node.count();
            let min = if visit.parent.is_none() { 1 } else { rank };
            if count < min || count >= degree {
                return Err(violation(format!(
                    "{} holds {} keys, allowed {}..{}",
                    node.id(),
                    count,
                    min,
                    degree
                )));
            }

            let keys = node.keys();
            for pair in keys.windows(2) {
                if pair[0] >= pair[1] {
                    return Err(violation(format!(
                        "{} keys out of order: {} then {}",
                        node.id(),
                        pair[0],
                        pair[1]
                    )));
                }
            }
            if let (Some(lower), Some(first)) = (&visit.lower, keys.first()) {
                if first <= lower {
                    return Err(violation(format!(
                        "{} key {} not above bound {}",
                        node.id(),
                        first,
                        lower
                    )));
                }
            }
            if let (Some(upper), Some(last)) = (&visit.upper, keys.last()) {
                if last > upper {
                    return Err(violation(format!(
                        "{} key {} above bound {}",
                        node.id(),
                        last,
                        upper
                    )));
                }
            }

            if node.is_leaf() {
                if visit.depth != level {
                    return Err(violation(format!(
                        "leaf {} at depth {}, level is {}",
                        node.id(),
                        visit.depth,
                        level
                    )));
                }
                shape.keys += count;
                leaves.push(node.id());
                continue;
            }

            let children = node.children()?;
            for (i, &child) in children.iter().enumerate() {
                if i < count {
                    let max = self.subtree_max(child)?;
                    if max.as_ref() != Some(&keys[i]) {
                        return Err(violation(format!(
                            "{} separator {} but left subtree max is {:?}",
                            node.id(),
                            keys[i],
                            max
                        )));
                    }
                }
            }
            // Reverse push keeps the walk left to right.
            for (i, &child) in children.iter().enumerate().rev() {
                stack.push(Visit {
                    id: child,
                    parent: Some(node.id()),
                    lower: if i == 0 {
                        visit.lower.clone()
                    } else {
                        Some(keys[i - 1].clone())
                    },
                    upper: if i == count {
                        visit.upper.clone()
                    } else {
                        Some(keys[i].clone())
                    },
                    depth: visit.depth + 1,
                });
            }
        }

        let chain = self.leaf_chain()?;
        if chain != leaves {
            return Err(violation(format!(
                "leaf chain {:?} differs from tree order {:?}",
                chain, leaves
            )));
        }

        if shape.keys != descriptor.key_count() as usize
            || shape.nodes != descriptor.node_count() as usize
        {
            return Err(violation(format!(
                "descriptor counts {} keys / {} nodes, found {} / {}",
                descriptor.key_count(),
                descriptor.node_count(),
                shape.keys,
                shape.nodes
            )));
        }

        shape.height = level;
        shape.leaves = leaves.len();
        Ok(shape)
    }

    /// Leaf ids in chain order, starting at the leaf head.
    fn leaf_chain(&mut self) -> Result<Vec<BlockId>> {
        let limit = self.descriptor().node_count() as usize;
        let mut chain = Vec::new();
        let mut next = self.descriptor().leaf_head();

        while let Some(id) = next {
            if chain.len() >= limit {
                return Err(violation(format!("leaf chain longer than {} nodes", limit)));
            }
            chain.push(id);
            next = self.load(id)?.next_leaf();
        }
        Ok(chain)
    }

    /// Every entry in key order, read from the leaf chain.
    pub fn scan(&mut self) -> Result<Vec<(Key, RowLocator)>> {
        let mut entries = Vec::with_capacity(self.len());
        for id in self.leaf_chain()? {
            let leaf = self.load(id)?;
            entries.extend((0..leaf.count()).map(|i| (leaf.key(i), leaf.locator(i))));
        }
        Ok(entries)
    }

    /// Human readable listing of the descriptor and every node, pre-order.
    pub fn dump(&mut self) -> Result<String> {
        let d = self.descriptor().clone();
        let mut lines = vec![format!(
            "index {:?} ({}, rank {}): keys={} nodes={} level={} root={:?} leaf_head={:?}",
            d.name(),
            d.key_type().name(),
            d.rank(),
            d.key_count(),
            d.node_count(),
            d.level(),
            d.root().map(|id| id.0),
            d.leaf_head().map(|id| id.0)
        )];

        let Some(root) = d.root() else {
            return Ok(render(lines));
        };

        let mut stack = vec![(root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            if depth >= d.level() as usize {
                return Err(violation(format!("{} below level {}", id, d.level())));
            }
            let node = self.load(id)?;
            let keys: Vec<String> = node.keys().iter().map(|k| k.to_string()).collect();
            let parent = node.parent().map(|p| p.0);
            let indent = "  ".repeat(depth);

            if node.is_leaf() {
                let values: Vec<String> = (0..node.count())
                    .map(|i| node.locator(i).to_string())
                    .collect();
                lines.push(format!(
                    "{}leaf {} count={} parent={:?} keys=[{}] values=[{}] next={:?}",
                    indent,
                    id.0,
                    node.count(),
                    parent,
                    keys.join(", "),
                    values.join(", "),
                    node.next_leaf().map(|n| n.0)
                ));
            } else {
                let children = node.children()?;
                let ids: Vec<String> = children.iter().map(|c| c.0.to_string()).collect();
                lines.push(format!(
                    "{}internal {} count={} parent={:?} keys=[{}] children=[{}]",
                    indent,
                    id.0,
                    node.count(),
                    parent,
                    keys.join(", "),
                    ids.join(", ")
                ));
                for &child in children.iter().rev() {
                    stack.push((child, depth + 1));
                }
            }
        }
        Ok(render(lines))
    }
}

fn render(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
