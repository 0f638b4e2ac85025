//! Typed fixed-length keys.
//!
//! Every key of an index has the same [`KeyType`] and the same encoded
//! length. Nodes store keys as raw bytes; ordering is decided by
//! `compare_raw` so a node can be searched without decoding its keys.

use std::cmp::Ordering;
use std::fmt;

use crate::common::{Error, Result};

/// Encoding of the keys of one index.
///
/// Uses `#[repr(u8)]` so the code can be stored in the index descriptor.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// 4-byte little-endian `i32`.
    Int = 1,
    /// 4-byte little-endian `f32`, ordered with `total_cmp`.
    Float = 2,
    /// Fixed-length byte string, NUL padded, ordered bytewise.
    Char = 3,
}

impl KeyType {
    /// Convert from the stored code, returning `None` for unknown values.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(KeyType::Int),
            2 => Some(KeyType::Float),
            3 => Some(KeyType::Char),
            _ => None,
        }
    }

    /// Human readable name, used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            KeyType::Int => "int",
            KeyType::Float => "float",
            KeyType::Char => "char",
        }
    }

    /// Encoded length, if fixed by the type.
    pub fn fixed_len(self) -> Option<usize> {
        match self {
            KeyType::Int | KeyType::Float => Some(4),
            KeyType::Char => None,
        }
    }
}

/// Compare two raw keys of the same type.
///
/// Both slices must hold a full key (4 bytes for numeric types).
pub(crate) fn compare_raw(key_type: KeyType, a: &[u8], b: &[u8]) -> Ordering {
    match key_type {
        KeyType::Int => read_i32(a).cmp(&read_i32(b)),
        KeyType::Float => read_f32(a).total_cmp(&read_f32(b)),
        KeyType::Char => a.cmp(b),
    }
}

fn read_i32(bytes: &[u8]) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    i32::from_le_bytes(buf)
}

fn read_f32(bytes: &[u8]) -> f32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    f32::from_le_bytes(buf)
}

/// A typed key value.
///
/// Keys of different types never meet inside one index; across types they
/// order by type code first so that `Ord` stays total.
///
/// # Example
/// ```
/// use blockindex::index::btree::Key;
///
/// assert!(Key::int(-3) < Key::int(2));
/// assert!(Key::text("apple", 8).unwrap() < Key::text("banana", 8).unwrap());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Key {
    key_type: KeyType,
    bytes: Vec<u8>,
}

impl Key {
    /// An integer key.
    pub fn int(value: i32) -> Self {
        Self {
            key_type: KeyType::Int,
            bytes: value.to_le_bytes().to_vec(),
        }
    }

    /// A float key.
    pub fn float(value: f32) -> Self {
        Self {
            key_type: KeyType::Float,
            bytes: value.to_le_bytes().to_vec(),
        }
    }

    /// A character key padded with NULs to `key_len` bytes.
    ///
    /// # Errors
    /// Returns `Error::KeyTooLong` if `value` does not fit.
    pub fn text(value: &str, key_len: usize) -> Result<Self> {
        let raw = value.as_bytes();
        if raw.len() > key_len {
            return Err(Error::KeyTooLong {
                len: raw.len(),
                max: key_len,
            });
        }

        let mut bytes = vec![0u8; key_len];
        bytes[..raw.len()].copy_from_slice(raw);
        Ok(Self {
            key_type: KeyType::Char,
            bytes,
        })
    }

    /// Wrap raw key bytes of the given type.
    ///
    /// # Errors
    /// Returns `Error::KeyMismatch` if a numeric key is not exactly 4 bytes,
    /// or a char key is empty.
    pub fn from_raw(key_type: KeyType, bytes: &[u8]) -> Result<Self> {
        let valid = match key_type.fixed_len() {
            Some(len) => bytes.len() == len,
            None => !bytes.is_empty(),
        };
        if !valid {
            return Err(Error::KeyMismatch {
                expected: key_type.name(),
                expected_len: key_type.fixed_len().unwrap_or(1),
                found: key_type.name(),
                found_len: bytes.len(),
            });
        }
        Ok(Self::from_stored(key_type, bytes))
    }

    /// Wrap key bytes read from a node slot, already sized by the layout.
    pub(crate) fn from_stored(key_type: KeyType, bytes: &[u8]) -> Self {
        Self {
            key_type,
            bytes: bytes.to_vec(),
        }
    }

    /// The key's type.
    #[inline]
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Encoded key bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encoded length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// `true` only for a zero-length key, which no index accepts.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The integer value, if this is an int key.
    pub fn as_int(&self) -> Option<i32> {
        (self.key_type == KeyType::Int).then(|| read_i32(&self.bytes))
    }

    /// The float value, if this is a float key.
    pub fn as_float(&self) -> Option<f32> {
        (self.key_type == KeyType::Float).then(|| read_f32(&self.bytes))
    }

    /// The string value with NUL padding stripped, if this is a char key.
    pub fn as_text(&self) -> Option<String> {
        if self.key_type != KeyType::Char {
            return None;
        }
        let end = self
            .bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.bytes.len());
        Some(String::from_utf8_lossy(&self.bytes[..end]).into_owned())
    }

    /// Compare against raw bytes of the same key type.
    #[inline]
    pub(crate) fn cmp_raw(&self, other: &[u8]) -> Ordering {
        compare_raw(self.key_type, &self.bytes, other)
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.key_type as u8)
            .cmp(&(other.key_type as u8))
            .then_with(|| compare_raw(self.key_type, &self.bytes, &other.bytes))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key_type {
            KeyType::Int => write!(f, "{}", read_i32(&self.bytes)),
            KeyType::Float => write!(f, "{}", read_f32(&self.bytes)),
            KeyType::Char => write!(f, "{:?}", self.as_text().unwrap_or_default()),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({}:{})", self.key_type.name(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_type_from_u8() {
        assert_eq!(KeyType::from_u8(1), Some(KeyType::Int));
        assert_eq!(KeyType::from_u8(2), Some(KeyType::Float));
        assert_eq!(KeyType::from_u8(3), Some(KeyType::Char));
        assert_eq!(KeyType::from_u8(0), None);
        assert_eq!(KeyType::from_u8(255), None);
    }

    #[test]
    fn test_int_ordering_handles_negatives() {
        // Bytewise comparison of little-endian values would get this wrong.
        assert!(Key::int(-1) < Key::int(0));
        assert!(Key::int(255) < Key::int(256));
        assert!(Key::int(i32::MIN) < Key::int(i32::MAX));
        assert_eq!(Key::int(7).cmp(&Key::int(7)), Ordering::Equal);
    }

    #[test]
    fn test_float_ordering() {
        assert!(Key::float(-1.5) < Key::float(0.25));
        assert!(Key::float(1.0) < Key::float(1.5));
        assert!(Key::float(f32::NEG_INFINITY) < Key::float(f32::MIN));
    }

    #[test]
    fn test_text_ordering_and_padding() {
        let ab = Key::text("ab", 6).unwrap();
        let abc = Key::text("abc", 6).unwrap();
        let b = Key::text("b", 6).unwrap();

        assert!(ab < abc);
        assert!(abc < b);
        assert_eq!(ab.len(), 6);
        assert_eq!(ab.as_bytes(), b"ab\0\0\0\0");
        assert_eq!(ab.as_text().as_deref(), Some("ab"));
    }

    #[test]
    fn test_text_too_long() {
        match Key::text("toolong", 4) {
            Err(Error::KeyTooLong { len: 7, max: 4 }) => {}
            other => panic!("Expected KeyTooLong, got {:?}", other),
        }
    }

    #[test]
    fn test_raw_roundtrip() {
        let key = Key::int(-42);
        let raw = Key::from_raw(KeyType::Int, key.as_bytes()).unwrap();
        assert_eq!(raw, key);
        assert_eq!(raw.as_int(), Some(-42));
        assert_eq!(raw.as_float(), None);
    }

    #[test]
    fn test_from_raw_rejects_short_numeric_keys() {
        match Key::from_raw(KeyType::Int, &[1, 2]) {
            Err(Error::KeyMismatch {
                expected_len: 4,
                found_len: 2,
                ..
            }) => {}
            other => panic!("Expected KeyMismatch, got {:?}", other),
        }
        assert!(Key::from_raw(KeyType::Float, &[0; 5]).is_err());
        assert!(Key::from_raw(KeyType::Char, &[]).is_err());

        let text = Key::from_raw(KeyType::Char, b"ab\0").unwrap();
        assert_eq!(text.as_text().as_deref(), Some("ab"));
    }

    #[test]
    fn test_cmp_raw() {
        let key = Key::int(10);
        assert_eq!(key.cmp_raw(&9i32.to_le_bytes()), Ordering::Greater);
        assert_eq!(key.cmp_raw(&10i32.to_le_bytes()), Ordering::Equal);
        assert_eq!(key.cmp_raw(&11i32.to_le_bytes()), Ordering::Less);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Key::int(5)), "5");
        assert_eq!(format!("{}", Key::text("hi", 4).unwrap()), "\"hi\"");
        assert_eq!(format!("{:?}", Key::int(5)), "Key(int:5)");
    }
}
