use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Length in bytes of every block digest.
pub const DIGEST_LEN: usize = 32;

/// Immutable byte container holding a hash output.
///
/// Block digests are always [`DIGEST_LEN`] bytes. The only other digest a
/// chain ever sees is the zero-length [`Digest::empty`] used as the genesis
/// block's predecessor. Equality and ordering are byte-wise.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Digest(Vec<u8>);

impl Digest {
    /// The zero-length digest. Predecessor of every genesis block.
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Wrap a pre-computed 32-byte hash.
    pub fn from_hash(hash: [u8; DIGEST_LEN]) -> Self {
        Self(hash.to_vec())
    }

    /// Copy arbitrary bytes into a digest.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The byte at position `i`, or `None` past the end.
    pub fn get(&self, i: usize) -> Option<u8> {
        self.0.get(i).copied()
    }

    /// Lowercase hex, two digits per byte.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..self.0.len().min(4)])
    }

    /// Parse from a hex string. Any even-length hex string is accepted.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "Digest(<empty>)")
        } else {
            write!(f, "Digest({})", self.short_hex())
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self::from_hash(bytes)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
