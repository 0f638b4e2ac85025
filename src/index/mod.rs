//! Index structures.
//!
//! - [`btree`] - Disk-backed B+ tree mapping typed keys to row locators

pub mod btree;
