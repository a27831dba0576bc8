//! Content hashing for cache invalidation and incremental rebuilds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 128-bit content hash computed using XXH3 for cache invalidation.
///
/// Two inputs with the same `ContentHash` are assumed to be identical.
/// Used to detect when source files, resolved configurations, or declared
/// dependencies have changed and an artifact needs recompilation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }

    /// Returns the raw 16-byte digest.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// Error returned when parsing a [`ContentHash`] from its hex form fails.
#[derive(Debug, thiserror::Error)]
#[error("invalid content hash '{input}'")]
pub struct ParseHashError {
    /// The string that failed to parse.
    pub input: String,
}

impl FromStr for ContentHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 32 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseHashError {
                input: s.to_string(),
            });
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| ParseHashError {
                input: s.to_string(),
            })?;
        }
        Ok(Self(bytes))
    }
}

/// Streaming XXH3-128 hasher for composite cache keys.
///
/// A composite key covers several inputs in sequence (source content,
/// resolved configuration, every declared dependency). Each input is
/// length-prefixed so that concatenation ambiguity cannot produce key
/// collisions between different input splits.
pub struct CompositeHasher {
    inner: xxhash_rust::xxh3::Xxh3,
}

impl CompositeHasher {
    /// Creates a fresh hasher with no input.
    pub fn new() -> Self {
        Self {
            inner: xxhash_rust::xxh3::Xxh3::new(),
        }
    }

    /// Feeds one length-prefixed input into the hash.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(&(data.len() as u64).to_le_bytes());
        self.inner.update(data);
    }

    /// Feeds an already-computed hash as one input.
    pub fn update_hash(&mut self, hash: &ContentHash) {
        self.update(hash.as_bytes());
    }

    /// Finishes the hash and returns the composite digest.
    pub fn finish(self) -> ContentHash {
        ContentHash(self.inner.digest128().to_le_bytes())
    }
}

impl Default for CompositeHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = ContentHash::from_bytes(b"hello world");
        let b = ContentHash::from_bytes(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn different_inputs_differ() {
        let a = ContentHash::from_bytes(b"hello");
        let b = ContentHash::from_bytes(b"world");
        assert_ne!(a, b);
    }

    #[test]
    fn display_format() {
        let h = ContentHash::from_bytes(b"test");
        let s = format!("{h}");
        assert_eq!(s.len(), 32, "Display should be 32 hex chars");
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn display_roundtrip() {
        let h = ContentHash::from_bytes(b"roundtrip");
        let parsed: ContentHash = format!("{h}").parse().unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!("not a hash".parse::<ContentHash>().is_err());
        assert!("abcd".parse::<ContentHash>().is_err());
        assert!("zz".repeat(16).parse::<ContentHash>().is_err());
    }

    #[test]
    fn debug_abbreviated() {
        let h = ContentHash::from_bytes(b"test");
        let s = format!("{h:?}");
        assert!(s.starts_with("ContentHash("));
        assert!(s.ends_with(")"));
    }

    #[test]
    fn serde_roundtrip() {
        let h = ContentHash::from_bytes(b"serde test");
        let json = serde_json::to_string(&h).unwrap();
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);
    }

    #[test]
    fn composite_deterministic() {
        let mut a = CompositeHasher::new();
        a.update(b"one");
        a.update(b"two");
        let mut b = CompositeHasher::new();
        b.update(b"one");
        b.update(b"two");
        assert_eq!(a.finish(), b.finish());
    }

    #[test]
    fn composite_order_matters() {
        let mut a = CompositeHasher::new();
        a.update(b"one");
        a.update(b"two");
        let mut b = CompositeHasher::new();
        b.update(b"two");
        b.update(b"one");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn composite_split_is_unambiguous() {
        // "ab" + "c" must not hash equal to "a" + "bc".
        let mut a = CompositeHasher::new();
        a.update(b"ab");
        a.update(b"c");
        let mut b = CompositeHasher::new();
        b.update(b"a");
        b.update(b"bc");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn composite_of_hashes() {
        let h1 = ContentHash::from_bytes(b"first");
        let h2 = ContentHash::from_bytes(b"second");
        let mut a = CompositeHasher::new();
        a.update_hash(&h1);
        a.update_hash(&h2);
        let mut b = CompositeHasher::new();
        b.update_hash(&h1);
        b.update_hash(&h2);
        assert_eq!(a.finish(), b.finish());
    }
}
