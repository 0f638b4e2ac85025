//! Index descriptor - tree-wide metadata for one index.
//!
//! The descriptor is owned by the catalog between operations and by the
//! [`BPlusTree`](super::BPlusTree) while one runs. The tree mutates it in
//! memory; persisting it (see [`IndexDescriptor::to_bytes`]) is the
//! catalog's job.

use crate::common::config::max_rank;
use crate::common::{BlockId, Error, Result};
use crate::index::btree::key::KeyType;
use crate::index::btree::layout::NodeLayout;

/// Persistent metadata record of a B+ tree index.
///
/// # Invariant
/// `root.is_none() ⇔ key_count == 0 ⇔ node_count == 0`
///
/// # Encoding
/// ```text
/// Offset   Size  Field
/// ------   ----  -----
/// 0        4     magic "BPIX"
/// 4        1     key type code
/// 5        4     key length
/// 9        4     rank
/// 13       4     root block id (-1 = empty)
/// 17       4     leaf head block id (-1 = empty)
/// 21       4     key count
/// 25       4     node count
/// 29       4     level
/// 33       4     block count (next block id to allocate)
/// 37       2     name length n
/// 39       n     name (UTF-8)
/// 39+n     4     CRC32 of bytes [0, 39+n)
/// ```
/// All integers are little-endian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    name: String,
    key_type: KeyType,
    key_len: usize,
    rank: usize,
    pub(crate) root: Option<BlockId>,
    pub(crate) leaf_head: Option<BlockId>,
    pub(crate) key_count: u32,
    pub(crate) node_count: u32,
    pub(crate) level: u32,
    pub(crate) block_count: u32,
}

impl IndexDescriptor {
    const MAGIC: &'static [u8; 4] = b"BPIX";
    const OFFSET_KEY_TYPE: usize = 4;
    const OFFSET_KEY_LEN: usize = 5;
    const OFFSET_RANK: usize = 9;
    const OFFSET_ROOT: usize = 13;
    const OFFSET_LEAF_HEAD: usize = 17;
    const OFFSET_KEY_COUNT: usize = 21;
    const OFFSET_NODE_COUNT: usize = 25;
    const OFFSET_LEVEL: usize = 29;
    const OFFSET_BLOCK_COUNT: usize = 33;
    const OFFSET_NAME_LEN: usize = 37;
    const OFFSET_NAME: usize = 39;
    const CHECKSUM_SIZE: usize = 4;

    /// Describe a new, empty index using the largest rank that fits a block.
    ///
    /// # Errors
    /// - `Error::InvalidLayout` if no node with these keys fits a block
    /// - `Error::InvalidDescriptor` if the name is longer than 65535 bytes
    pub fn new(name: impl Into<String>, key_type: KeyType, key_len: usize) -> Result<Self> {
        let name = name.into();
        if name.len() > u16::MAX as usize {
            return Err(Error::InvalidDescriptor(format!(
                "name of {} bytes exceeds {}",
                name.len(),
                u16::MAX
            )));
        }
        let rank = max_rank(key_len);
        NodeLayout::new(key_type, key_len, rank)?;

        Ok(Self {
            name,
            key_type,
            key_len,
            rank,
            root: None,
            leaf_head: None,
            key_count: 0,
            node_count: 0,
            level: 0,
            block_count: 0,
        })
    }

    /// Override the rank (smaller ranks give deeper trees).
    ///
    /// # Errors
    /// Returns `Error::InvalidLayout` if the rank is 0 or too large for a
    /// block, and `Error::InvalidDescriptor` if the index already has nodes.
    pub fn with_rank(mut self, rank: usize) -> Result<Self> {
        if self.node_count != 0 {
            return Err(Error::InvalidDescriptor(
                "rank of a populated index cannot change".into(),
            ));
        }
        NodeLayout::new(self.key_type, self.key_len, rank)?;
        self.rank = rank;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn key_len(&self) -> usize {
        self.key_len
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Maximum key count before a node splits.
    pub fn degree(&self) -> usize {
        2 * self.rank + 1
    }

    /// Root block, or `None` if the index holds no keys.
    pub fn root(&self) -> Option<BlockId> {
        self.root
    }

    /// Leftmost leaf, or `None` if the index holds no keys.
    pub fn leaf_head(&self) -> Option<BlockId> {
        self.leaf_head
    }

    pub fn key_count(&self) -> u32 {
        self.key_count
    }

    pub fn node_count(&self) -> u32 {
        self.node_count
    }

    /// Tree height; 0 when empty, 1 for a lone root leaf.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Number of block ids handed out so far.
    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Node geometry for this index.
    pub fn layout(&self) -> Result<NodeLayout> {
        NodeLayout::new(self.key_type, self.key_len, self.rank)
    }

    /// Hand out a never-used block id.
    pub(crate) fn allocate_block(&mut self) -> Result<BlockId> {
        let id = BlockId::new(self.block_count);
        if !id.is_valid() {
            return Err(Error::InvalidDescriptor("block ids exhausted".into()));
        }
        self.block_count += 1;
        Ok(id)
    }

    /// Encode the descriptor with a trailing CRC32.
    pub fn to_bytes(&self) -> Vec<u8> {
        let name = self.name.as_bytes();
        let mut out = Vec::with_capacity(Self::OFFSET_NAME + name.len() + Self::CHECKSUM_SIZE);

        out.extend_from_slice(Self::MAGIC);
        out.push(self.key_type as u8);
        out.extend_from_slice(&(self.key_len as u32).to_le_bytes());
        out.extend_from_slice(&(self.rank as u32).to_le_bytes());
        out.extend_from_slice(&BlockId::to_raw(self.root).to_le_bytes());
        out.extend_from_slice(&BlockId::to_raw(self.leaf_head).to_le_bytes());
        out.extend_from_slice(&self.key_count.to_le_bytes());
        out.extend_from_slice(&self.node_count.to_le_bytes());
        out.extend_from_slice(&self.level.to_le_bytes());
        out.extend_from_slice(&self.block_count.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(name);

        let checksum = crc32fast::hash(&out);
        out.extend_from_slice(&checksum.to_le_bytes());
        out
    }

    /// Decode and verify a descriptor produced by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    /// - `Error::InvalidDescriptor` for truncated data, bad magic, an unknown
    ///   key type or counts that break the emptiness invariant
    /// - `Error::ChecksumMismatch` if the CRC32 does not match
    /// - `Error::InvalidLayout` if key length and rank do not fit a block
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::OFFSET_NAME + Self::CHECKSUM_SIZE {
            return Err(Error::InvalidDescriptor(format!(
                "{} bytes is too short",
                data.len()
            )));
        }
        if &data[..4] != Self::MAGIC {
            return Err(Error::InvalidDescriptor("bad magic".into()));
        }

        let name_len = u16::from_le_bytes([
            data[Self::OFFSET_NAME_LEN],
            data[Self::OFFSET_NAME_LEN + 1],
        ]) as usize;
        let body_len = Self::OFFSET_NAME + name_len;
        if data.len() != body_len + Self::CHECKSUM_SIZE {
            return Err(Error::InvalidDescriptor(format!(
                "expected {} bytes, got {}",
                body_len + Self::CHECKSUM_SIZE,
                data.len()
            )));
        }

        let stored = read_u32(data, body_len);
        let computed = crc32fast::hash(&data[..body_len]);
        if stored != computed {
            return Err(Error::ChecksumMismatch { stored, computed });
        }

        let code = data[Self::OFFSET_KEY_TYPE];
        let key_type = KeyType::from_u8(code)
            .ok_or_else(|| Error::InvalidDescriptor(format!("unknown key type {}", code)))?;
        let key_len = read_u32(data, Self::OFFSET_KEY_LEN) as usize;
        let rank = read_u32(data, Self::OFFSET_RANK) as usize;
        NodeLayout::new(key_type, key_len, rank)?;

        let name = String::from_utf8(data[Self::OFFSET_NAME..body_len].to_vec())
            .map_err(|_| Error::InvalidDescriptor("name is not UTF-8".into()))?;

        let descriptor = Self {
            name,
            key_type,
            key_len,
            rank,
            root: BlockId::from_raw(read_u32(data, Self::OFFSET_ROOT)),
            leaf_head: BlockId::from_raw(read_u32(data, Self::OFFSET_LEAF_HEAD)),
            key_count: read_u32(data, Self::OFFSET_KEY_COUNT),
            node_count: read_u32(data, Self::OFFSET_NODE_COUNT),
            level: read_u32(data, Self::OFFSET_LEVEL),
            block_count: read_u32(data, Self::OFFSET_BLOCK_COUNT),
        };

        let empty = descriptor.root.is_none();
        if empty != (descriptor.key_count == 0)
            || empty != (descriptor.node_count == 0)
            || empty != descriptor.leaf_head.is_none()
        {
            return Err(Error::InvalidDescriptor(
                "root, leaf head and counts disagree on emptiness".into(),
            ));
        }

        Ok(descriptor)
    }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_descriptor_is_empty() {
        let desc = IndexDescriptor::new("idx_id", KeyType::Int, 4).unwrap();
        assert!(desc.is_empty());
        assert_eq!(desc.root(), None);
        assert_eq!(desc.leaf_head(), None);
        assert_eq!(desc.key_count(), 0);
        assert_eq!(desc.node_count(), 0);
        assert_eq!(desc.level(), 0);
        assert_eq!(desc.rank(), max_rank(4));
        assert_eq!(desc.degree(), 2 * max_rank(4) + 1);
    }

    #[test]
    fn test_with_rank() {
        let desc = IndexDescriptor::new("idx", KeyType::Int, 4)
            .unwrap()
            .with_rank(1)
            .unwrap();
        assert_eq!(desc.rank(), 1);
        assert_eq!(desc.degree(), 3);

        let desc = IndexDescriptor::new("idx", KeyType::Int, 4).unwrap();
        assert!(desc.clone().with_rank(0).is_err());
        assert!(desc.with_rank(max_rank(4) + 1).is_err());
    }

    #[test]
    fn test_allocate_block_is_monotonic() {
        let mut desc = IndexDescriptor::new("idx", KeyType::Int, 4).unwrap();
        assert_eq!(desc.allocate_block().unwrap(), BlockId::new(0));
        assert_eq!(desc.allocate_block().unwrap(), BlockId::new(1));
        assert_eq!(desc.allocate_block().unwrap(), BlockId::new(2));
        assert_eq!(desc.block_count(), 3);
    }

    #[test]
    fn test_roundtrip() {
        let mut desc = IndexDescriptor::new("orders_by_name", KeyType::Char, 16)
            .unwrap()
            .with_rank(3)
            .unwrap();
        desc.root = Some(BlockId::new(7));
        desc.leaf_head = Some(BlockId::new(0));
        desc.key_count = 40;
        desc.node_count = 9;
        desc.level = 3;
        desc.block_count = 11;

        let bytes = desc.to_bytes();
        assert_eq!(&bytes[..4], b"BPIX");
        assert_eq!(IndexDescriptor::from_bytes(&bytes).unwrap(), desc);
    }

    #[test]
    fn test_rejects_oversized_name() {
        match IndexDescriptor::new("n".repeat(65_537), KeyType::Int, 4) {
            Err(Error::InvalidDescriptor(msg)) => assert!(msg.contains("65537")),
            other => panic!("Expected InvalidDescriptor, got {:?}", other),
        }

        let longest = IndexDescriptor::new("n".repeat(65_535), KeyType::Int, 4).unwrap();
        let decoded = IndexDescriptor::from_bytes(&longest.to_bytes()).unwrap();
        assert_eq!(decoded.name().len(), 65_535);
    }

    #[test]
    fn test_empty_root_encoded_as_sentinel() {
        let desc = IndexDescriptor::new("idx", KeyType::Int, 4).unwrap();
        let bytes = desc.to_bytes();
        assert_eq!(&bytes[13..17], &[0xFF; 4]);
        assert_eq!(&bytes[17..21], &[0xFF; 4]);
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let desc = IndexDescriptor::new("idx", KeyType::Int, 4).unwrap();
        let mut bytes = desc.to_bytes();
        bytes[9] ^= 0x01; // flip a rank bit

        match IndexDescriptor::from_bytes(&bytes) {
            Err(Error::ChecksumMismatch { .. }) => {}
            other => panic!("Expected ChecksumMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_truncated_and_bad_magic() {
        let bytes = IndexDescriptor::new("idx", KeyType::Int, 4)
            .unwrap()
            .to_bytes();

        assert!(IndexDescriptor::from_bytes(&bytes[..10]).is_err());
        assert!(IndexDescriptor::from_bytes(&bytes[..bytes.len() - 1]).is_err());

        let mut bad = bytes.clone();
        bad[0] = b'X';
        match IndexDescriptor::from_bytes(&bad) {
            Err(Error::InvalidDescriptor(_)) => {}
            other => panic!("Expected InvalidDescriptor, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_inconsistent_emptiness() {
        let mut desc = IndexDescriptor::new("idx", KeyType::Int, 4).unwrap();
        desc.key_count = 3; // but no root

        match IndexDescriptor::from_bytes(&desc.to_bytes()) {
            Err(Error::InvalidDescriptor(_)) => {}
            other => panic!("Expected InvalidDescriptor, got {:?}", other),
        }
    }
}
