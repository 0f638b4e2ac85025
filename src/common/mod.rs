//! Common types and utilities shared across the index.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants (block size, node header offsets)
//! - Error types
//! - Block identifiers

mod block_id;
pub mod config;
pub mod error;

pub use block_id::BlockId;
pub use error::{Error, Result};
