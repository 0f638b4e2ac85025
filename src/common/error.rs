//! Error types for the index.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the index.
///
/// Expected negative outcomes (duplicate key on insert, absent key on delete,
/// empty range) are NOT errors; they are reported as `Ok(false)`, `Ok(None)`
/// or an empty `Vec`. Everything here aborts the current operation.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the block file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested block has never been written (or was discarded).
    #[error("Block {0} not found")]
    BlockNotFound(u32),

    /// The tree's structural invariants do not hold.
    ///
    /// This indicates a bug or on-disk corruption. The operation that
    /// detected it is aborted; the tree may be left inconsistent.
    #[error("Structural invariant violated: {0}")]
    StructuralViolation(String),

    /// Key type, key length and rank do not describe a node that fits a block.
    #[error("Invalid node layout: {0}")]
    InvalidLayout(String),

    /// A key does not match the index's key type or length.
    #[error("Key mismatch: expected {expected} key of {expected_len} bytes, got {found} key of {found_len} bytes")]
    KeyMismatch {
        expected: &'static str,
        expected_len: usize,
        found: &'static str,
        found_len: usize,
    },

    /// A character key is longer than the index's key length.
    #[error("Key of {len} bytes exceeds key length {max}")]
    KeyTooLong { len: usize, max: usize },

    /// Block number or offset does not fit the packed 16/16-bit row locator.
    #[error("Row locator out of range: block {block_num}, offset {offset}")]
    LocatorOutOfRange { block_num: u32, offset: u32 },

    /// Stored descriptor checksum does not match its contents.
    #[error("Descriptor checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    /// Descriptor bytes are malformed.
    #[error("Invalid index descriptor: {0}")]
    InvalidDescriptor(String),

    /// Comparison operator string is not one of `=`, `>`, `>=`, `<`, `<=`.
    #[error("Unknown comparison operator: {0:?}")]
    UnknownOperator(String),
}

impl Error {
    /// Shorthand for building a [`Error::StructuralViolation`].
    pub(crate) fn structural(msg: impl Into<String>) -> Self {
        Error::StructuralViolation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::BlockNotFound(42);
        assert_eq!(format!("{}", err), "Block 42 not found");

        let err = Error::structural("locate on leaf");
        assert_eq!(
            format!("{}", err),
            "Structural invariant violated: locate on leaf"
        );

        let err = Error::LocatorOutOfRange {
            block_num: 1,
            offset: 70000,
        };
        assert_eq!(
            format!("{}", err),
            "Row locator out of range: block 1, offset 70000"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error as _;

        let err: Error = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert!(err.source().is_some());
        assert!(Error::BlockNotFound(1).source().is_none());
    }
}
