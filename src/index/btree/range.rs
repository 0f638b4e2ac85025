//! Range queries over the leaf chain.
//!
//! A range query descends once to the boundary leaf and then only follows
//! `next_leaf` pointers. The chain is forward-only, so `<` and `<=` walk from
//! the chain head up to the boundary.

use std::fmt;
use std::str::FromStr;

use crate::common::{Error, Result};
use crate::index::btree::key::Key;
use crate::index::btree::locator::RowLocator;
use crate::index::btree::tree::{BPlusTree, Lookup};
use crate::storage::BlockStore;

/// Comparison operator of a range query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparison {
    pub fn as_str(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
        }
    }
}

impl FromStr for Comparison {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "=" => Ok(Comparison::Eq),
            ">" => Ok(Comparison::Gt),
            ">=" => Ok(Comparison::Ge),
            "<" => Ok(Comparison::Lt),
            "<=" => Ok(Comparison::Le),
            other => Err(Error::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<S: BlockStore> BPlusTree<S> {
    /// Row locators of every key satisfying `stored <op> key`, in key order.
    ///
    /// # Errors
    /// Returns `Error::KeyMismatch` for a foreign key and
    /// `Error::StructuralViolation` if the leaf chain is broken.
    ///
    /// # Example
    /// ```
    /// use blockindex::index::btree::{BPlusTree, Comparison, IndexDescriptor, Key, KeyType};
    /// use blockindex::storage::MemoryBlockStore;
    ///
    /// let descriptor = IndexDescriptor::new("t", KeyType::Int, 4)?.with_rank(1)?;
    /// let mut tree = BPlusTree::new(descriptor, MemoryBlockStore::new())?;
    /// for k in 1..=5 {
    ///     tree.insert(&Key::int(k), 0, k as u32)?;
    /// }
    ///
    /// let above: Vec<u32> = tree
    ///     .range_query(&Key::int(2), Comparison::Gt)?
    ///     .iter()
    ///     .map(|loc| loc.offset())
    ///     .collect();
    /// assert_eq!(above, vec![3, 4, 5]);
    /// # Ok::<(), blockindex::Error>(())
    /// ```
    pub fn range_query(&mut self, key: &Key, op: Comparison) -> Result<Vec<RowLocator>> {
        self.layout().check_key(key)?;
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let lookup = self.locate_leaf(key)?;
        match op {
            Comparison::Eq => Ok(if lookup.found {
                vec![lookup.node.locator(lookup.index)]
            } else {
                Vec::new()
            }),
            Comparison::Gt | Comparison::Ge => self.scan_from(lookup, op),
            Comparison::Lt | Comparison::Le => self.scan_until(lookup, op),
        }
    }

    /// `>` and `>=`: boundary leaf onward.
    fn scan_from(&mut self, lookup: Lookup, op: Comparison) -> Result<Vec<RowLocator>> {
        let Lookup { node, index, found } = lookup;
        let count = node.count();

        // Without a match, a leaf ending below the key can only be the last.
        if !found && index >= count {
            return Ok(Vec::new());
        }

        let start = if found && op == Comparison::Gt {
            index + 1
        } else {
            index
        };

        let mut out: Vec<RowLocator> = (start..count).map(|i| node.locator(i)).collect();
        let mut next = node.next_leaf();
        let mut steps = 0;
        while let Some(id) = next {
            self.guard_chain(&mut steps)?;
            let leaf = self.load(id)?;
            out.extend((0..leaf.count()).map(|i| leaf.locator(i)));
            next = leaf.next_leaf();
        }
        Ok(out)
    }

    /// `<` and `<=`: chain head up to the boundary leaf.
    fn scan_until(&mut self, lookup: Lookup, op: Comparison) -> Result<Vec<RowLocator>> {
        let Lookup { node, index, found } = lookup;
        let end = if found && op == Comparison::Le {
            index + 1
        } else {
            index
        };

        let head = self.leaf_head_id()?;
        if end == 0 && node.id() == head {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        let mut current = head;
        let mut steps = 0;
        while current != node.id() {
            self.guard_chain(&mut steps)?;
            let leaf = self.load(current)?;
            out.extend((0..leaf.count()).map(|i| leaf.locator(i)));
            current = leaf.next_leaf().ok_or_else(|| {
                Error::structural(format!("leaf chain ends before {}", node.id()))
            })?;
        }

        out.extend((0..end).map(|i| node.locator(i)));
        Ok(out)
    }

    /// Bound a chain walk by the number of nodes in the index.
    fn guard_chain(&self, steps: &mut u32) -> Result<()> {
        *steps += 1;
        if *steps > self.descriptor().node_count() {
            return Err(Error::structural(format!(
                "leaf chain longer than {} nodes",
                self.descriptor().node_count()
            )));
        }
        Ok(())
    }
}
