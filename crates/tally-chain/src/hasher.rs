use tally_types::{Digest, Transfer};

/// Computes block digests with BLAKE3.
///
/// The hashed byte string is the concatenation of:
/// index (4-byte big-endian), source bytes, target bytes,
/// amount (4-byte big-endian), previous digest bytes, nonce (8-byte big-endian).
///
/// Field boundaries are not length-prefixed, so `("ab", "c")` and `("a", "bc")`
/// hash the same name bytes. The encoding is fixed; changing it would
/// invalidate every mined nonce.
pub struct BlockHasher;

impl BlockHasher {
    /// Digest of a block with the given fields.
    pub fn compute(index: u32, transfer: &Transfer, previous: &Digest, nonce: u64) -> Digest {
        Digest::from_hash(Self::hash_fields(index, transfer, previous, nonce))
    }

    /// Raw 32-byte hash of the block fields.
    pub fn hash_fields(index: u32, transfer: &Transfer, previous: &Digest, nonce: u64) -> [u8; 32] {
        let mut hasher = Self::prefix(index, transfer, previous);
        hasher.update(&nonce.to_be_bytes());
        *hasher.finalize().as_bytes()
    }

    /// Hasher state with every field except the nonce already absorbed.
    ///
    /// The miner clones this once per attempt instead of re-hashing the
    /// fixed part of the block.
    pub(crate) fn prefix(index: u32, transfer: &Transfer, previous: &Digest) -> blake3::Hasher {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&index.to_be_bytes());
        hasher.update(transfer.source.as_bytes());
        hasher.update(transfer.target.as_bytes());
        hasher.update(&transfer.amount.to_be_bytes());
        hasher.update(previous.as_bytes());
        hasher
    }

    /// Whether `expected` is the digest of the given fields.
    pub fn verify(
        index: u32,
        transfer: &Transfer,
        previous: &Digest,
        nonce: u64,
        expected: &Digest,
    ) -> bool {
        Self::compute(index, transfer, previous, nonce) == *expected
    }
}
