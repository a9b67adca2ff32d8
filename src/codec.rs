//! Byte codec and content hashing shared by blocks, transactions and the
//! chain checkpoint.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Encode a value for the store.
pub fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

/// Decode a value read from the store.
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

/// Canonical SHA-256 over named fields fed in a fixed order.
///
/// Integers are written as fixed-width little-endian bytes and strings are
/// length-prefixed, so two different field sequences never collide on the
/// same byte stream.
pub struct ContentHasher {
    hasher: Sha256,
}

impl ContentHasher {
    pub fn new(domain: &str) -> Self {
        let mut hasher = ContentHasher {
            hasher: Sha256::new(),
        };
        hasher.str(domain);
        hasher
    }

    pub fn str(&mut self, value: &str) -> &mut Self {
        self.hasher.update((value.len() as u64).to_le_bytes());
        self.hasher.update(value.as_bytes());
        self
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.hasher.update(value.to_le_bytes());
        self
    }

    pub fn i64(&mut self, value: i64) -> &mut Self {
        self.hasher.update(value.to_le_bytes());
        self
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.hasher.update(value.to_le_bytes());
        self
    }

    /// Lowercase hex of the 32-byte digest.
    pub fn finish_hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// True if the first `difficulty` hex characters of `hash` are all `'0'`.
pub fn has_leading_zeros(hash: &str, difficulty: u32) -> bool {
    let difficulty = difficulty as usize;
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|c| c == b'0')
}
