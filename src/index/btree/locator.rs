//! Row locators - the values stored in leaf nodes.

use std::fmt;

use crate::common::config::{MAX_ROW_BLOCK, MAX_ROW_OFFSET};
use crate::common::{Error, Result};

/// Physical position of a row: data block number plus in-block offset.
///
/// Packed into one 32-bit leaf value as `(block_num << 16) | offset`. The
/// 16-bit halves are a hard format limit.
///
/// # Example
/// ```
/// use blockindex::index::btree::RowLocator;
///
/// let loc = RowLocator::new(3, 128).unwrap();
/// assert_eq!(loc.pack(), (3 << 16) | 128);
/// assert_eq!(RowLocator::unpack(loc.pack()), loc);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowLocator {
    block_num: u16,
    offset: u16,
}

impl RowLocator {
    /// Build a locator, checking both halves fit in 16 bits.
    ///
    /// # Errors
    /// Returns `Error::LocatorOutOfRange` if `block_num` or `offset` exceeds
    /// 65535.
    pub fn new(block_num: u32, offset: u32) -> Result<Self> {
        if block_num > MAX_ROW_BLOCK || offset > MAX_ROW_OFFSET {
            return Err(Error::LocatorOutOfRange { block_num, offset });
        }
        Ok(Self {
            block_num: block_num as u16,
            offset: offset as u16,
        })
    }

    /// Data block number (high 16 bits).
    #[inline]
    pub fn block_num(&self) -> u32 {
        self.block_num as u32
    }

    /// In-block offset (low 16 bits).
    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset as u32
    }

    /// Encode as the 32-bit leaf value.
    #[inline]
    pub fn pack(&self) -> u32 {
        ((self.block_num as u32) << 16) | self.offset as u32
    }

    /// Decode a 32-bit leaf value.
    #[inline]
    pub fn unpack(value: u32) -> Self {
        Self {
            block_num: (value >> 16) as u16,
            offset: (value & MAX_ROW_OFFSET) as u16,
        }
    }
}

impl fmt::Display for RowLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block_num, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_layout() {
        let loc = RowLocator::new(0x1234, 0xABCD).unwrap();
        assert_eq!(loc.pack(), 0x1234_ABCD);
        assert_eq!(loc.block_num(), 0x1234);
        assert_eq!(loc.offset(), 0xABCD);
    }

    #[test]
    fn test_unpack_extremes() {
        let loc = RowLocator::unpack(u32::MAX);
        assert_eq!(loc.block_num(), 0xFFFF);
        assert_eq!(loc.offset(), 0xFFFF);

        let loc = RowLocator::unpack(0);
        assert_eq!((loc.block_num(), loc.offset()), (0, 0));
    }

    #[test]
    fn test_offset_cap() {
        assert!(RowLocator::new(0, 65535).is_ok());
        match RowLocator::new(0, 65536) {
            Err(Error::LocatorOutOfRange {
                block_num: 0,
                offset: 65536,
            }) => {}
            other => panic!("Expected LocatorOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_block_cap() {
        assert!(RowLocator::new(65535, 0).is_ok());
        assert!(RowLocator::new(65536, 0).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", RowLocator::new(2, 40).unwrap()), "2:40");
    }
}
